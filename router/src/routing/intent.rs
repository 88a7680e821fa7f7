//! Keyword-based intent classification
//!
//! Best-effort: anything that does not look like a filesystem request goes to
//! the HTTP transport.

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Transport chosen for an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Remote HTTP endpoint
    LocalHttp,
    /// Stdio filesystem server
    SubprocessFs,
}

/// File/folder nouns and read/write verbs (English and Spanish)
const FS_KEYWORDS: &[&str] = &[
    "file",
    "files",
    "folder",
    "folders",
    "directory",
    "read",
    "write",
    "archivo",
    "archivos",
    "fichero",
    "carpeta",
    "carpetas",
    "directorio",
    "leer",
    "lee",
    "escribir",
    "escribe",
    "txt",
];

/// Extensions that mark a filename such as `notas.txt`
const FILE_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "csv", "log", "toml", "yaml", "yml", "xml", "html", "pdf",
];

#[derive(Debug, Clone)]
pub struct IntentRouter {
    pattern: Regex,
}

impl IntentRouter {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_keywords(&[])
    }

    /// Router that also treats `extra` words as filesystem keywords
    pub fn with_keywords(extra: &[String]) -> Result<Self, ConfigError> {
        let words: Vec<String> = FS_KEYWORDS
            .iter()
            .map(|w| regex::escape(w))
            .chain(
                extra
                    .iter()
                    .filter(|w| !w.trim().is_empty())
                    .map(|w| regex::escape(w.trim())),
            )
            .collect();

        let pattern = format!(
            r"\b(?:{})\b|\w\.(?:{})\b",
            words.join("|"),
            FILE_EXTENSIONS.join("|")
        );

        let pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()?;

        Ok(Self { pattern })
    }

    pub fn classify(&self, instruction: &str) -> Route {
        if self.pattern.is_match(instruction) {
            Route::SubprocessFs
        } else {
            Route::LocalHttp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_instruction_goes_to_subprocess() {
        let router = IntentRouter::new().unwrap();
        assert_eq!(router.classify("lee el archivo notas.txt"), Route::SubprocessFs);
        assert_eq!(router.classify("Read the FILE please"), Route::SubprocessFs);
        assert_eq!(router.classify("crea una carpeta nueva"), Route::SubprocessFs);
    }

    #[test]
    fn test_extension_marker() {
        let router = IntentRouter::new().unwrap();
        assert_eq!(router.classify("abre reporte.CSV"), Route::SubprocessFs);
    }

    #[test]
    fn test_other_instructions_go_to_http() {
        let router = IntentRouter::new().unwrap();
        assert_eq!(router.classify("muéstrame mis tareas"), Route::LocalHttp);
        assert_eq!(router.classify("what time is it?"), Route::LocalHttp);
        assert_eq!(router.classify(""), Route::LocalHttp);
    }

    #[test]
    fn test_matches_whole_words_only() {
        let router = IntentRouter::new().unwrap();
        // "already" contains "read", "profile" contains "file"
        assert_eq!(router.classify("already done, update my profile"), Route::LocalHttp);
    }

    #[test]
    fn test_extra_keywords() {
        let router = IntentRouter::with_keywords(&["documento".to_string(), " ".to_string()]).unwrap();
        assert_eq!(router.classify("guarda el documento"), Route::SubprocessFs);
        assert_eq!(router.classify("agenda una reunión"), Route::LocalHttp);
    }

    #[test]
    fn test_deterministic() {
        let router = IntentRouter::new().unwrap();
        let text = "escribe hola en saludo.txt";
        assert_eq!(router.classify(text), router.classify(text));
    }
}
