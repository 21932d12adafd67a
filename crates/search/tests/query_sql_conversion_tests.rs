use search::{compile, compile_trace_ids, QueryParam, TraceSearchQuery};
use test_each_file::test_each_file;

/// Placeholder numbers in order of appearance
fn placeholders(sql: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut rest = sql;
    while let Some(pos) = rest.find('$') {
        let digits: String = rest[pos + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            out.push(digits.parse().unwrap());
        }
        rest = &rest[pos + 1..];
    }
    out
}

test_each_file! { in "./crates/search/queries" => test_query_compilation }

fn test_query_compilation(content: &str) {
    let query: TraceSearchQuery = serde_json::from_str(content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture: {}\n{}", e, content));

    for compiled in [compile(&query), compile_trace_ids(&query)] {
        // Placeholders are numbered 1..=n in order of appearance, n == params
        let expected: Vec<usize> = (1..=compiled.params.len()).collect();
        assert_eq!(
            placeholders(&compiled.sql),
            expected,
            "placeholders out of order for query: {}",
            content
        );

        // Text values never reach the SQL text
        for param in &compiled.params {
            if let QueryParam::Text(value) = param {
                assert!(
                    !compiled.sql.contains(value.as_str()),
                    "value {:?} was interpolated into SQL:\n{}",
                    value,
                    compiled.sql
                );
            }
        }

        if query.is_unconstrained() {
            assert!(compiled.params.is_empty());
            assert!(compiled.sql.contains("TRUE"));
        }

        // Limit is the last parameter and equals num_traces
        if query.num_traces > 0 {
            assert_eq!(
                compiled.params.last(),
                Some(&QueryParam::BigInt(query.num_traces as i64))
            );
        } else {
            assert!(!compiled.sql.contains("LIMIT"));
        }
    }

    // 2k tag parameters, each an adjacent (key, value) pair in key order
    let compiled = compile(&query);
    let offset = usize::from(!query.service_name.is_empty())
        + usize::from(!query.operation_name.is_empty());
    for (i, (key, value)) in query.tags.iter().enumerate() {
        assert_eq!(compiled.params[offset + 2 * i], QueryParam::Text(key.clone()));
        assert_eq!(compiled.params[offset + 2 * i + 1], QueryParam::Text(value.clone()));
    }
    assert_eq!(compiled.shape().matches("tag").count(), usize::from(!query.tags.is_empty()));
}

#[test]
fn test_service_scenario() {
    let compiled = compile(&TraceSearchQuery::new().with_service_name("checkout"));
    assert_eq!(compiled.sql.matches("s.resource_tags OPERATOR").count(), 1);
    assert_eq!(compiled.params, vec![QueryParam::Text("checkout".to_string())]);
}

#[test]
fn test_compiled_display_has_no_values() {
    let compiled = compile(&TraceSearchQuery::new().with_tag("user.email", "jane@example.com"));
    let rendered = compiled.to_string();
    assert!(rendered.starts_with("-- shape: tag\n-- $1: text\n-- $2: text\n"));
    assert!(!rendered.contains("jane@example.com"));
}
