use cadlisp_core::Value;
use cadlisp_reader::{read_many, read_str, Reader};
use proptest::prelude::*;

proptest! {
    #[test]
    fn reader_never_panics(input in "\\PC*") {
        // Any arbitrary string should produce Ok or Err, never panic
        let _ = read_str(&input);
    }

    #[test]
    fn reader_many_never_panics(input in "\\PC*") {
        let _ = read_many(&input);
    }

    #[test]
    fn stateful_reader_never_panics(input in "[()\\[\\]{}'`~@. a-z0-9\";]*") {
        if let Ok(mut reader) = Reader::new(&input) {
            for _ in 0..64 {
                match reader.read_next() {
                    Ok(Some(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

fn lisp_atom() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i64..1000).prop_map(|n| n.to_string()),
        (-100.0f64..100.0).prop_map(|f| format!("{f:.2}")),
        "[a-zA-Z0-9 _]{0,20}".prop_map(|s| format!("\"{s}\"")),
        "[a-z][a-z0-9?!-]{0,10}",
        "[a-z][a-z0-9-]{0,10}".prop_map(|s| format!(":{s}")),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("nil".to_string()),
    ]
}

fn lisp_expr(depth: u32) -> impl Strategy<Value = String> {
    if depth == 0 {
        lisp_atom().boxed()
    } else {
        prop_oneof![
            lisp_atom(),
            prop::collection::vec(lisp_expr(depth - 1), 0..5)
                .prop_map(|items| format!("({})", items.join(" "))),
            prop::collection::vec(lisp_expr(depth - 1), 0..5)
                .prop_map(|items| format!("[{}]", items.join(" "))),
            (lisp_expr(depth - 1), lisp_expr(depth - 1))
                .prop_map(|(head, tail)| format!("({head} . {tail})")),
            lisp_atom().prop_map(|a| format!("'{a}")),
        ]
        .boxed()
    }
}

/// Printable data values: no lambdas, builtins, atoms, files or handles.
fn data_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Real),
        "[ -~\t\n]{0,12}".prop_map(|s| Value::string(&s)),
        "[a-z*!?<>=][a-z0-9*+!?<>=-]{0,8}"
            .prop_filter("reserved words", |s| !matches!(s.as_str(), "nil" | "true" | "false"))
            .prop_map(|s| Value::symbol(&s)),
        "[a-z][a-z0-9-]{0,8}".prop_map(|s| Value::keyword(&s)),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::list),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::vector),
            prop::collection::vec((inner.clone(), inner.clone()), 0..3).prop_map(Value::hashmap),
            (inner.clone(), inner).prop_map(|(h, t)| Value::dotted_pair(h, t)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn generated_forms_parse(expr in lisp_expr(3)) {
        read_str(&expr).unwrap_or_else(|e| {
            panic!("Failed to parse generated expr: {expr:?}\nError: {e}")
        });
    }

    #[test]
    fn multiple_forms_parse(exprs in prop::collection::vec(lisp_expr(2), 1..5)) {
        let input = exprs.join(" ");
        let result = read_many(&input).unwrap_or_else(|e| {
            panic!("Failed to parse: {input:?}\nError: {e}")
        });
        prop_assert_eq!(result.len(), exprs.len());
    }

    #[test]
    fn readable_print_round_trips(value in data_value()) {
        let printed = value.print(true);
        let reread = read_str(&printed).unwrap_or_else(|e| {
            panic!("Failed to re-read {printed:?}\nError: {e}")
        });
        prop_assert_eq!(reread, value, "printed as {}", printed);
    }
}
