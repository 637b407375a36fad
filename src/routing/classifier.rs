//! Query classifier — raw SQL → read or write.

use std::fmt;

/// Statement keywords that mutate data or schema.
const WRITE_KEYWORDS: &[&str] = &["insert", "update", "delete", "create"];

/// Whether a query must go to the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClassification {
    Write,
    Read,
}

impl fmt::Display for QueryClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryClassification::Write => write!(f, "write"),
            QueryClassification::Read => write!(f, "read"),
        }
    }
}

/// Classify a query by its leading keyword.
///
/// Never fails: anything that does not start with a write keyword,
/// including empty input, is a read.
pub fn classify(query: &str) -> QueryClassification {
    let head = query.trim_start();
    let is_write = WRITE_KEYWORDS.iter().any(|kw| {
        head.get(..kw.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(kw))
    });

    if is_write {
        QueryClassification::Write
    } else {
        QueryClassification::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_keywords() {
        for q in [
            "INSERT INTO actor VALUES (1)",
            "update actor set first_name='A'",
            "Delete FROM actor WHERE actor_id=1",
            "CREATE TABLE t (id int)",
        ] {
            assert_eq!(classify(q), QueryClassification::Write, "{q}");
        }
    }

    #[test]
    fn test_leading_whitespace_is_ignored() {
        assert_eq!(classify("  \n\tinsert into t values (1)"), QueryClassification::Write);
    }

    #[test]
    fn test_reads() {
        for q in [
            "SELECT * FROM actor;",
            "show tables",
            "",
            "   ",
            "-- insert into t",
            "ins",
            "selectinsert",
        ] {
            assert_eq!(classify(q), QueryClassification::Read, "{q:?}");
        }
    }

    #[test]
    fn test_prefix_match_only() {
        // The keyword set is matched as a prefix, so identifiers that start
        // with one still count as writes.
        assert_eq!(classify("created_at"), QueryClassification::Write);
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        assert_eq!(classify("élan"), QueryClassification::Read);
        assert_eq!(classify("日本語のクエリ"), QueryClassification::Read);
    }
}
