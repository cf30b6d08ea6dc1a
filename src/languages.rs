//! 语言标识解析
//!
//! XLIFF处理核心只透传语言标识，这里负责把 `english`、`Spanish`、`zh-CN`
//! 之类的自由格式标识解析成Google翻译使用的语言代码。

use regex::Regex;

use crate::error::Result;
use crate::translation_error;

/// Google翻译支持的语言名称与代码
pub const GOOGLE_LANGUAGES: &[(&str, &str)] = &[
    ("afrikaans", "af"),
    ("albanian", "sq"),
    ("amharic", "am"),
    ("arabic", "ar"),
    ("armenian", "hy"),
    ("azerbaijani", "az"),
    ("basque", "eu"),
    ("belarusian", "be"),
    ("bengali", "bn"),
    ("bosnian", "bs"),
    ("bulgarian", "bg"),
    ("catalan", "ca"),
    ("chinese (simplified)", "zh-CN"),
    ("chinese (traditional)", "zh-TW"),
    ("croatian", "hr"),
    ("czech", "cs"),
    ("danish", "da"),
    ("dutch", "nl"),
    ("english", "en"),
    ("esperanto", "eo"),
    ("estonian", "et"),
    ("filipino", "tl"),
    ("finnish", "fi"),
    ("french", "fr"),
    ("galician", "gl"),
    ("georgian", "ka"),
    ("german", "de"),
    ("greek", "el"),
    ("gujarati", "gu"),
    ("hebrew", "iw"),
    ("hindi", "hi"),
    ("hungarian", "hu"),
    ("icelandic", "is"),
    ("indonesian", "id"),
    ("irish", "ga"),
    ("italian", "it"),
    ("japanese", "ja"),
    ("kannada", "kn"),
    ("kazakh", "kk"),
    ("korean", "ko"),
    ("latvian", "lv"),
    ("lithuanian", "lt"),
    ("macedonian", "mk"),
    ("malay", "ms"),
    ("malayalam", "ml"),
    ("maltese", "mt"),
    ("marathi", "mr"),
    ("mongolian", "mn"),
    ("nepali", "ne"),
    ("norwegian", "no"),
    ("persian", "fa"),
    ("polish", "pl"),
    ("portuguese", "pt"),
    ("punjabi", "pa"),
    ("romanian", "ro"),
    ("russian", "ru"),
    ("serbian", "sr"),
    ("slovak", "sk"),
    ("slovenian", "sl"),
    ("spanish", "es"),
    ("swahili", "sw"),
    ("swedish", "sv"),
    ("tamil", "ta"),
    ("telugu", "te"),
    ("thai", "th"),
    ("turkish", "tr"),
    ("ukrainian", "uk"),
    ("urdu", "ur"),
    ("uzbek", "uz"),
    ("vietnamese", "vi"),
    ("welsh", "cy"),
    ("yiddish", "yi"),
    ("zulu", "zu"),
];

/// 名称的常见别名
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("chinese", "zh-CN"),
    ("mandarin", "zh-CN"),
    ("castilian", "es"),
    ("farsi", "fa"),
    ("tagalog", "tl"),
];

/// 语言代码的形态：`en`、`haw`、`zh-CN`、`pt-BR`
const LANGUAGE_CODE_PATTERN: &str = r"^[A-Za-z]{2,3}(-[A-Za-z]{2,4})?$";

/// 把自由格式的语言标识解析为Google语言代码
///
/// 依次尝试：`auto`（仅源语言可用，由调用方决定）、语言名称、别名、
/// 已知语言代码（大小写不敏感）。无法识别时返回配置错误。
pub fn resolve_google_language(lang: &str) -> Result<String> {
    let normalized = lang.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(translation_error!(config, "language", "语言标识不能为空"));
    }

    if normalized == "auto" {
        return Ok("auto".to_string());
    }

    if let Some((_, code)) = GOOGLE_LANGUAGES
        .iter()
        .chain(LANGUAGE_ALIASES.iter())
        .find(|(name, _)| *name == normalized)
    {
        return Ok(code.to_string());
    }

    let code_regex = Regex::new(LANGUAGE_CODE_PATTERN)
        .map_err(|e| translation_error!(config, "language", e))?;
    if code_regex.is_match(lang.trim()) {
        if let Some((_, code)) = GOOGLE_LANGUAGES
            .iter()
            .find(|(_, code)| code.eq_ignore_ascii_case(lang.trim()))
        {
            return Ok(code.to_string());
        }

        // 带地区后缀但不在表中的代码，退回到主语言代码
        if let Some((primary, _)) = normalized.split_once('-') {
            if let Some((_, code)) = GOOGLE_LANGUAGES.iter().find(|(_, code)| *code == primary) {
                return Ok(code.to_string());
            }
        }
    }

    Err(translation_error!(
        config,
        "language",
        format!("不支持的语言: {}", lang)
    ))
}
