use std::io;
use std::path::Path;

use rand::seq::SliceRandom;

/// Read the site list, drop blanks and comments, and shuffle the order so
/// repeated runs do not always hit the same sites first.
pub fn load_sites(path: &Path) -> io::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    let mut sites = parse_sites(&raw);
    sites.shuffle(&mut rand::thread_rng());
    Ok(sites)
}

fn parse_sites(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_comments() {
        let raw = "https://a.example\n\n# not a site\n  https://b.example  \n";
        let sites = parse_sites(raw);
        assert_eq!(sites, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn empty_file_yields_no_sites() {
        assert!(parse_sites("\n# only comments\n").is_empty());
    }

    #[test]
    fn load_shuffles_but_keeps_membership() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.txt");
        std::fs::write(&path, "https://a.example\nhttps://b.example\nhttps://c.example\n")
            .unwrap();

        let mut sites = load_sites(&path).unwrap();
        sites.sort();
        assert_eq!(
            sites,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
    }
}
