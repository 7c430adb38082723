//! Load facts from external data sources.

use std::fs;

use gavotte_syntax::{DataSource, DataSourceDeclaration, Symbol};

use crate::ReasonerError;

/// Rows of constants for the declared predicate.
pub(crate) fn load(
    declaration: &DataSourceDeclaration,
) -> Result<Vec<Vec<Symbol>>, ReasonerError> {
    match &declaration.source {
        DataSource::Csv(path) => {
            let text = fs::read_to_string(path).map_err(|source| ReasonerError::DataSource {
                path: path.clone(),
                source,
            })?;
            parse_csv(&text, declaration)
        }
    }
}

fn field(raw: &str) -> Symbol {
    let raw = raw.trim();
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .map(|r| r.replace("\"\"", "\""))
        .unwrap_or_else(|| raw.to_owned());
    Symbol::new(unquoted)
}

fn parse_csv(
    text: &str,
    declaration: &DataSourceDeclaration,
) -> Result<Vec<Vec<Symbol>>, ReasonerError> {
    let arity = declaration.predicate.arity;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let row = if arity == 0 {
                vec![]
            } else {
                line.split(',').map(field).collect::<Vec<_>>()
            };
            if row.len() == arity {
                Ok(row)
            } else {
                Err(ReasonerError::ArityMismatch {
                    predicate: declaration.predicate.clone(),
                    expected: arity,
                    found: row.len(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use gavotte_syntax::Predicate;

    fn edge() -> DataSourceDeclaration {
        DataSourceDeclaration::new(
            Predicate::new("edge", 2),
            DataSource::Csv(PathBuf::from("edges.csv")),
        )
    }

    #[test]
    fn rows() {
        let rows = parse_csv("a, b\n\n\"c d\",e\n", &edge()).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Symbol::from("a"), Symbol::from("b")],
                vec![Symbol::from("c d"), Symbol::from("e")],
            ]
        );
    }

    #[test]
    fn arity_mismatch() {
        assert!(matches!(
            parse_csv("a,b,c\n", &edge()),
            Err(ReasonerError::ArityMismatch { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn missing_file() {
        let missing = DataSourceDeclaration::new(
            Predicate::new("edge", 2),
            DataSource::Csv(PathBuf::from("/nonexistent/gavotte/edges.csv")),
        );
        assert!(matches!(load(&missing), Err(ReasonerError::DataSource { .. })));
    }
}
