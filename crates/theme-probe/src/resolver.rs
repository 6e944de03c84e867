//! Published theme selection.

use crate::error::{ProbeError, ProbeResult};
use crate::types::ThemeSummary;
use tracing::warn;

/// Pick the theme whose role marks it as published.
///
/// When several themes claim the main role the first one in list order wins.
pub fn resolve_published(themes: &[ThemeSummary]) -> ProbeResult<ThemeSummary> {
    let mut published = themes.iter().filter(|t| t.role.is_published());

    let first = published
        .next()
        .ok_or_else(|| ProbeError::NotFound("no theme with role MAIN".to_string()))?;

    let extra: Vec<u64> = published.map(|t| t.id).collect();
    if !extra.is_empty() {
        warn!(
            "{} themes claim role MAIN, using {} (ignored: {:?})",
            extra.len() + 1,
            first.id,
            extra
        );
    }

    Ok(first.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_main_theme() {
        let themes = vec![
            ThemeSummary::new(1, "Draft", "UNPUBLISHED"),
            ThemeSummary::new(2, "Live", "MAIN"),
        ];
        assert_eq!(resolve_published(&themes).unwrap().id, 2);
    }

    #[test]
    fn test_no_main_theme_is_not_found() {
        let themes = vec![
            ThemeSummary::new(1, "Draft", "unpublished"),
            ThemeSummary::new(3, "Dev", "development"),
        ];
        assert!(resolve_published(&themes).unwrap_err().is_not_found());
        assert!(resolve_published(&[]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_mixed_case_role() {
        let themes = vec![ThemeSummary::new(9, "Live", "Main")];
        assert_eq!(resolve_published(&themes).unwrap().id, 9);
    }

    #[test]
    fn test_first_of_duplicate_main_wins() {
        let themes = vec![
            ThemeSummary::new(4, "A", "main"),
            ThemeSummary::new(5, "B", "MAIN"),
        ];
        assert_eq!(resolve_published(&themes).unwrap().id, 4);
    }
}
