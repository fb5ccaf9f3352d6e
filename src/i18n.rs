// ==========================================
// 注塑排产管理系统 - 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库, 支持中文（默认）和英文
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locale_resolves_messages() {
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
        let msg = t("smart_schedule.change_success");
        assert!(!msg.is_empty());
        assert_ne!(msg, "smart_schedule.change_success");
    }
}
