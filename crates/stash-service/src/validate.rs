//! Input checks shared by several services.

use stash_core::error::AppError;
use stash_core::result::AppResult;

/// Check a node display name. Names become path segments and storage key
/// segments, so they may not contain `/` or be `.` / `..`.
pub(crate) fn node_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name.contains('/') {
        return Err(AppError::validation(format!(
            "Name cannot contain '/': {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid name: {name}")));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name() {
        assert_eq!(node_name("  report.pdf ").unwrap(), "report.pdf");
        assert!(node_name("").is_err());
        assert!(node_name("a/b").is_err());
        assert!(node_name("..").is_err());
    }
}
