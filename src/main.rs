// ==========================================
// 骑手周结算系统 - 命令行入口
// ==========================================
// 子命令: import / preview / settle / lookup / periods
// 输出: 结果以 JSON 写到 stdout，日志写到 stderr
// ==========================================

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rider_settlement::api::{ImportRequest, SettlementRequest};
use rider_settlement::app::{get_default_db_path, AppState, DB_PATH_ENV};
use rider_settlement::domain::{
    ReplaceScope, SettlementOverrides, SettlementPeriod, TaxBasePolicy,
};
use rider_settlement::importer::ProgressFn;
use rider_settlement::{i18n, logging};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Parser, Debug)]
#[command(name = "rider-settlement")]
#[command(about = "배달 라이더 주간 정산 시스템")]
#[command(version)]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<String>,

    /// 消息语言 (ko / en)
    #[arg(long, global = true, default_value = "ko")]
    locale: String,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 导入结算工作簿
    Import {
        file: String,
        #[command(flatten)]
        period: OptionalPeriod,
        #[arg(long, value_enum)]
        replace_scope: Option<ScopeArg>,
    },
    /// 分析工作簿（不写入）
    Preview {
        file: String,
        #[arg(long)]
        sample_rows: Option<usize>,
    },
    /// 计算并保存某周的最终结算
    Settle {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
        #[arg(long)]
        company_name: Option<String>,
        /// 人工调整项 JSON: {"라이더ID": {"mission_fee": 1000, "pre_deduction": -300}}
        #[arg(long)]
        overrides: Option<String>,
        /// 只计算不保存
        #[arg(long)]
        dry_run: bool,
    },
    /// 查询骑手某周的结算
    Lookup {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long)]
        rider: String,
    },
    /// 列出已保存结算的周期
    Periods,
}

#[derive(Args, Debug)]
struct PeriodArgs {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    month: i32,
    #[arg(long)]
    week: i32,
}

impl PeriodArgs {
    fn period(&self) -> SettlementPeriod {
        SettlementPeriod::new(self.year, self.month, self.week)
    }
}

#[derive(Args, Debug)]
struct OptionalPeriod {
    #[arg(long, requires_all = ["month", "week"])]
    year: Option<i32>,
    #[arg(long, requires_all = ["year", "week"])]
    month: Option<i32>,
    #[arg(long, requires_all = ["year", "month"])]
    week: Option<i32>,
}

impl OptionalPeriod {
    fn period(&self) -> Option<SettlementPeriod> {
        SettlementPeriod::from_parts(self.year, self.month, self.week)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Table,
    Period,
}

impl From<ScopeArg> for ReplaceScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Table => ReplaceScope::Table,
            ScopeArg::Period => ReplaceScope::Period,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Commission,
    Remuneration,
}

impl From<PolicyArg> for TaxBasePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Commission => TaxBasePolicy::Commission,
            PolicyArg::Remuneration => TaxBasePolicy::Remuneration,
        }
    }
}

/// 解析 --overrides；缺省时所有骑手按 0 处理
fn parse_overrides(raw: Option<&str>) -> Result<HashMap<String, SettlementOverrides>> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--overrides 不是有效的 JSON 对象"),
        None => Ok(HashMap::new()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json_logs);
    i18n::set_locale(&cli.locale);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(version = rider_settlement::VERSION, db_path = %db_path, "{}", rider_settlement::APP_NAME);

    let state = AppState::new(db_path).context("无法初始化应用状态")?;

    match cli.command {
        Command::Import {
            file,
            period,
            replace_scope,
        } => {
            let request = ImportRequest {
                period: period.period(),
                replace_scope: replace_scope.map(Into::into),
            };
            let progress: &mut ProgressFn = &mut |current: usize, total: usize, sheet: &str| {
                tracing::info!(current, total, sheet, "处理工作表");
            };
            let response = state
                .import_api
                .import_workbook(&file, request, Some(progress))
                .await
                .with_context(|| format!("导入失败: {}", file))?;
            let success = response.success;
            print_json(&response)?;
            if !success {
                std::process::exit(1);
            }
        }
        Command::Preview { file, sample_rows } => {
            let report = state
                .import_api
                .preview_workbook(&file, sample_rows)
                .await
                .with_context(|| format!("分析失败: {}", file))?;
            print_json(&report)?;
        }
        Command::Settle {
            period,
            policy,
            company_name,
            overrides,
            dry_run,
        } => {
            let request = SettlementRequest {
                policy: policy.map(Into::into),
                company_name,
                overrides: parse_overrides(overrides.as_deref())?,
            };
            if dry_run {
                let settlements = state.settlement_api.preview(period.period(), &request).await?;
                print_json(&settlements)?;
            } else {
                let response = state
                    .settlement_api
                    .save_final_settlements(period.period(), &request)
                    .await?;
                print_json(&response)?;
            }
        }
        Command::Lookup { period, rider } => {
            let lookup = state.rider_api.lookup(period.period(), &rider).await?;
            print_json(&lookup)?;
        }
        Command::Periods => {
            let periods = state.rider_api.available_periods().await?;
            print_json(&periods)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let parsed = parse_overrides(Some(
            r#"{"김철수1234": {"mission_fee": 1000, "pre_deduction": -300}, "이영희5678": {}}"#,
        ))
        .unwrap();
        assert_eq!(parsed["김철수1234"], SettlementOverrides::new(1000.0, -300.0));
        assert_eq!(parsed["이영희5678"], SettlementOverrides::default());

        assert!(parse_overrides(None).unwrap().is_empty());
        assert!(parse_overrides(Some("[1, 2]")).is_err());
    }

    #[test]
    fn test_cli_parses_settle_overrides() {
        let cli = Cli::try_parse_from([
            "rider-settlement",
            "settle",
            "--year",
            "2024",
            "--month",
            "6",
            "--week",
            "2",
            "--overrides",
            r#"{"김철수1234": {"mission_fee": 1000}}"#,
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Settle {
                overrides, dry_run, ..
            } => {
                assert!(dry_run);
                assert!(overrides.unwrap().contains("mission_fee"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
