// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持韩文（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"ko" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use rider_settlement::i18n::t;
/// let msg = t("api.rider.empty_id");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，占位符格式 `%{name}`）
///
/// # 示例
/// ```no_run
/// use rider_settlement::i18n::t_with_args;
/// let msg = t_with_args("import.log.saved", &[("table", "total_summary"), ("count", "12")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态，相关测试串行执行
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        set_locale("ko");
        assert_eq!(current_locale(), "ko");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("ko");
        assert_eq!(t("api.rider.empty_id"), "라이더 ID를 입력해주세요.");

        set_locale("en");
        assert_eq!(t("api.rider.empty_id"), "Please enter a rider ID.");

        set_locale("ko");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("ko");
        let msg = t_with_args("import.log.saved", &[("table", "deductions"), ("count", "7")]);
        assert!(msg.contains("deductions"));
        assert!(msg.contains("7개"));

        set_locale("en");
        let msg = t_with_args("import.log.sheet_not_found", &[("sheet", "종합")]);
        assert!(msg.contains("종합"));
        assert!(msg.contains("not found"));

        set_locale("ko");
    }
}
