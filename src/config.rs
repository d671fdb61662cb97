use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Tesseract invocation settings.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub languages: String,
    pub oem: u8,
    pub psm: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_bin: "tesseract".into(),
            languages: "eng+jpn".into(),
            oem: 1,
            psm: 6,
        }
    }
}

/// Hosted model used to turn OCR text into receipt fields.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
    pub upload_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "receiptwise".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "receiptwise-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let llm = LlmConfig {
            api_key: std::env::var("GOOGLE_API_KEY").context("GOOGLE_API_KEY must be set")?,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.into()),
        };
        let defaults = OcrConfig::default();
        let ocr = OcrConfig {
            tesseract_bin: std::env::var("TESSERACT_BIN").unwrap_or(defaults.tesseract_bin),
            languages: std::env::var("OCR_LANGUAGES").unwrap_or(defaults.languages),
            oem: env_parse("OCR_OEM").unwrap_or(defaults.oem),
            psm: env_parse("OCR_PSM").unwrap_or(defaults.psm),
        };
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Ok(Self {
            database_url,
            jwt,
            llm,
            ocr,
            upload_dir,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_defaults_match_mixed_language_receipts() {
        let ocr = OcrConfig::default();
        assert_eq!(ocr.tesseract_bin, "tesseract");
        assert_eq!(ocr.languages, "eng+jpn");
        assert_eq!(ocr.oem, 1);
        assert_eq!(ocr.psm, 6);
    }

    #[test]
    fn env_parse_ignores_garbage() {
        std::env::set_var("RECEIPTWISE_TEST_PARSE", "not-a-number");
        assert_eq!(env_parse::<i64>("RECEIPTWISE_TEST_PARSE"), None);
        std::env::set_var("RECEIPTWISE_TEST_PARSE", "42");
        assert_eq!(env_parse::<i64>("RECEIPTWISE_TEST_PARSE"), Some(42));
        std::env::remove_var("RECEIPTWISE_TEST_PARSE");
    }
}
