//! SQL rendering for single-row statements.

use sync_core::TypedValue;
use sync_engine::Statement;

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Render a full-table select with an explicit column list.
pub fn render_select(schema: &str, table: &str, columns: &[&str]) -> String {
    let columns = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {}", qualified_name(schema, table))
}

/// Render a statement as SQL with `$n` placeholders, returning the values to
/// bind in placeholder order.
pub fn render_statement<'a>(schema: &str, statement: &'a Statement) -> (String, Vec<&'a TypedValue>) {
    match statement {
        Statement::Insert { entity, values } => {
            let columns = values
                .iter()
                .map(|(c, _)| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=values.len())
                .map(|i| format!("${i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                qualified_name(schema, entity)
            );
            (sql, values.iter().map(|(_, v)| v).collect())
        }
        Statement::Update {
            entity,
            assignments,
            predicates,
        } => {
            let mut param_idx = 0;
            let mut next = || {
                param_idx += 1;
                format!("${param_idx}")
            };
            let sets = assignments
                .iter()
                .map(|(c, _)| format!("{} = {}", quote_ident(c), next()))
                .collect::<Vec<_>>()
                .join(", ");
            let filters = predicates
                .iter()
                .map(|(c, _)| format!("{} = {}", quote_ident(c), next()))
                .collect::<Vec<_>>()
                .join(" AND ");
            let sql = format!(
                "UPDATE {} SET {sets} WHERE {filters}",
                qualified_name(schema, entity)
            );
            let params = assignments
                .iter()
                .chain(predicates)
                .map(|(_, v)| v)
                .collect();
            (sql, params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{UniversalType, UniversalValue};

    fn typed(ty: UniversalType, v: impl Into<UniversalValue>) -> TypedValue {
        TypedValue::new(ty, v.into())
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("PRECOS"), "\"PRECOS\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified_name("public", "ATIVOS"), "\"public\".\"ATIVOS\"");
    }

    #[test]
    fn test_render_select() {
        assert_eq!(
            render_select("public", "PRECOS", &["TICKER", "DATA"]),
            "SELECT \"TICKER\", \"DATA\" FROM \"public\".\"PRECOS\""
        );
    }

    #[test]
    fn test_render_insert() {
        let statement = Statement::Insert {
            entity: "PRECOS".to_string(),
            values: vec![
                ("TICKER".to_string(), typed(UniversalType::Text, "AAA")),
                ("PRECO".to_string(), typed(UniversalType::Float64, 10.0)),
            ],
        };
        let (sql, params) = render_statement("public", &statement);
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"PRECOS\" (\"TICKER\", \"PRECO\") VALUES ($1, $2)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_render_update() {
        let statement = Statement::Update {
            entity: "PRECOS".to_string(),
            assignments: vec![("PRECO".to_string(), typed(UniversalType::Float64, 11.5))],
            predicates: vec![
                ("TICKER".to_string(), typed(UniversalType::Text, "AAA")),
                ("DATA".to_string(), typed(UniversalType::Date, "2024-01-01")),
            ],
        };
        let (sql, params) = render_statement("public", &statement);
        assert_eq!(
            sql,
            "UPDATE \"public\".\"PRECOS\" SET \"PRECO\" = $1 WHERE \"TICKER\" = $2 AND \"DATA\" = $3"
        );
        assert_eq!(params[0].value, UniversalValue::Float(11.5));
        assert_eq!(params[2].column_type, UniversalType::Date);
    }
}
