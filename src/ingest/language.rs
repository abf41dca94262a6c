//! Programming language detection from file extensions

/// Detect the lowercase language tag of a path, or "unknown"
pub fn detect_language(path: &str) -> String {
    let Some(ext) = extension(path) else {
        return "unknown".to_string();
    };

    let lang = match ext.as_str() {
        // Legacy languages
        "cob" | "cbl" | "cobol" | "cpy" => "cobol",
        "for" | "f90" | "f95" => "fortran",
        "pas" => "pascal",
        "ada" => "ada",

        // Programming languages
        "py" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "c" | "h" => "c",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "clj" => "clojure",
        "hs" => "haskell",
        "ml" => "ocaml",
        "r" => "r",
        "m" => "matlab",
        "pl" => "perl",
        "sh" | "bash" => "shell",
        "ps1" => "powershell",
        "bat" => "batch",
        "sql" => "sql",

        // Web technologies
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",

        // Data formats and config files
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" => "ini",
        "cfg" | "conf" => "config",

        // Documentation formats
        "md" | "markdown" => "markdown",
        "rst" => "restructuredtext",
        "txt" => "text",

        _ => "unknown",
    };

    lang.to_string()
}

/// Whether the extension marks a file that is never source text
pub fn is_binary_extension(path: &str) -> bool {
    matches!(
        extension(path).as_deref(),
        Some(
            "exe" | "dll" | "so" | "dylib" | "bin" | "obj" | "o" | "a" | "lib" | "jpg" | "jpeg"
                | "png" | "gif" | "bmp" | "ico" | "svg" | "pdf" | "zip" | "tar" | "gz" | "rar"
                | "7z" | "jar" | "war"
        )
    )
}

fn extension(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
