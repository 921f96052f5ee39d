//! Block splitting, categorization and closure tests

use super::*;
use crate::error::SourcePosition;
use crate::expr::{BinaryOperator, Expression};
use crate::tree::{Call, Conditional, Declaration, Scatter, Workflow, WorkflowElement};
use crate::types::Type;
use indexmap::IndexMap;

fn pos() -> SourcePosition {
    SourcePosition::new("test.wdl".to_string(), "test.wdl".to_string(), 1, 1, 1, 5)
}

fn int_ident(name: &str) -> Expression {
    Expression::typed_ident(pos(), name, Type::int())
}

fn decl(name: &str, expr: Expression) -> WorkflowElement {
    Declaration::new(pos(), Type::int(), name, Some(expr)).into()
}

fn plus(left: Expression, right: Expression) -> Expression {
    Expression::binary_op(pos(), BinaryOperator::Add, left, right).with_type(Type::int())
}

/// `call add { input: a = <a>, b = <b> }` with one Int output named `result`
fn add_call(alias: &str, a: Expression, b: Expression) -> Call {
    let mut inputs = IndexMap::new();
    inputs.insert("a".to_string(), a);
    inputs.insert("b".to_string(), b);
    let mut outputs = IndexMap::new();
    outputs.insert("result".to_string(), Type::int());
    Call::new(pos(), "add", Some(alias.to_string()), inputs).with_outputs(outputs)
}

fn call_output(call: &str, output: &str) -> Expression {
    Expression::get(pos(), Expression::ident(pos(), call), output).with_type(Type::int())
}

fn scatter_over(variable: &str, collection: &str, body: Vec<WorkflowElement>) -> WorkflowElement {
    Scatter::new(
        pos(),
        variable,
        Expression::typed_ident(pos(), collection, Type::array(Type::int())),
        body,
    )
    .into()
}

fn conditional_on(flag: &str, body: Vec<WorkflowElement>) -> WorkflowElement {
    Conditional::new(
        pos(),
        Expression::typed_ident(pos(), flag, Type::boolean()),
        body,
    )
    .into()
}

/// Four blocks:
/// 0. `Int x = n; call add as a1 {a = x, b = 1}`
/// 1. `call add as a2 {a = a1.result + 1, b = 2}`
/// 2. `Int y = 3; scatter (i in ns) { call add as a3 {..}; call add as a4 {..} }`
/// 3. `Int z = y + 1`
fn sample_elements() -> Vec<WorkflowElement> {
    vec![
        decl("x", int_ident("n")),
        add_call("a1", int_ident("x"), Expression::int(pos(), 1)).into(),
        add_call(
            "a2",
            plus(call_output("a1", "result"), Expression::int(pos(), 1)),
            Expression::int(pos(), 2),
        )
        .into(),
        decl("y", Expression::int(pos(), 3)),
        scatter_over(
            "i",
            "ns",
            vec![
                add_call("a3", int_ident("i"), int_ident("y")).into(),
                add_call("a4", call_output("a3", "result"), int_ident("i")).into(),
            ],
        ),
        decl("z", plus(int_ident("y"), Expression::int(pos(), 1))),
    ]
}

#[test]
fn test_split_is_a_partition() {
    let elements = sample_elements();
    let blocks = split_to_blocks(&elements);
    assert_eq!(blocks.len(), 4);
    assert_eq!(
        blocks.iter().map(Block::len).collect::<Vec<_>>(),
        vec![2, 1, 2, 1]
    );

    let rejoined: Vec<WorkflowElement> = blocks
        .into_iter()
        .flat_map(Block::into_nodes)
        .collect();
    assert_eq!(rejoined, elements);
}

#[test]
fn test_block_prefixes_are_call_free() {
    for block in split_to_blocks(&sample_elements()) {
        assert!(crate::tree::deep_find_calls(block.prefix()).is_empty());
        assert!(block.validate().is_ok());
    }
}

#[test]
fn test_split_empty_sequence() {
    assert!(split_to_blocks(&[]).is_empty());
}

#[test]
fn test_expressions_only_sequence_is_one_block() {
    let elements = vec![
        decl("a", Expression::int(pos(), 1)),
        decl("b", plus(int_ident("a"), Expression::int(pos(), 1))),
    ];
    let blocks = split_to_blocks(&elements);
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].is_pure_expressions());
    assert!(matches!(
        categorize(&blocks[0]).unwrap(),
        Category::AllExpressions { ref nodes } if nodes.len() == 2
    ));
}

#[test]
fn test_categories_of_sample() {
    let blocks = split_to_blocks(&sample_elements());
    let names: Vec<&str> = blocks
        .iter()
        .map(|block| categorize(block).unwrap().name())
        .collect();
    assert_eq!(
        names,
        vec![
            "CallDirect",
            "CallWithSubexpressions",
            "ScatterFullBlock",
            "AllExpressions"
        ]
    );

    let direct = categorize(&blocks[0]).unwrap();
    assert_eq!(direct.prefix().len(), 1);
    assert_eq!(direct.call().map(|c| c.name()), Some("a1"));
}

#[test]
fn test_call_fragment() {
    let elements = vec![
        decl("x", Expression::int(pos(), 1)),
        add_call("a1", plus(int_ident("x"), int_ident("n")), Expression::int(pos(), 1)).into(),
    ];
    let block = &split_to_blocks(&elements)[0];
    match categorize(block).unwrap() {
        Category::CallFragment { prefix, call } => {
            assert_eq!(prefix.len(), 1);
            assert_eq!(call.name(), "a1");
        }
        other => panic!("Expected CallFragment, got {}", other),
    }
}

#[test]
fn test_one_call_sections() {
    let cond = conditional_on(
        "flag",
        vec![add_call("a1", int_ident("x"), Expression::int(pos(), 1)).into()],
    );
    let block = Block::new(vec![cond]);
    match categorize(&block).unwrap() {
        Category::CondOneCall { call, cond, prefix } => {
            assert_eq!(call.name(), "a1");
            assert_eq!(cond.body.len(), 1);
            assert!(prefix.is_empty());
        }
        other => panic!("Expected CondOneCall, got {}", other),
    }

    let scatter = scatter_over(
        "i",
        "ns",
        vec![add_call("a1", int_ident("i"), Expression::int(pos(), 1)).into()],
    );
    let block = Block::new(vec![decl("k", Expression::int(pos(), 0)), scatter]);
    let category = categorize(&block).unwrap();
    assert_eq!(category.name(), "ScatterOneCall");
    assert_eq!(category.prefix().len(), 1);
    assert!(category.inner_body().is_err());
}

#[test]
fn test_section_with_computed_call_is_full_block() {
    let cond = conditional_on(
        "flag",
        vec![add_call("a1", plus(int_ident("x"), int_ident("x")), Expression::int(pos(), 1)).into()],
    );
    let category = categorize(&Block::new(vec![cond])).unwrap();
    assert_eq!(category.name(), "CondFullBlock");
    assert_eq!(category.inner_body().unwrap().len(), 1);
    assert!(category.call().is_none());
}

#[test]
fn test_categorize_rejects_call_in_prefix() {
    let block = Block::new(vec![
        add_call("a1", int_ident("x"), int_ident("y")).into(),
        decl("z", Expression::int(pos(), 1)),
    ]);
    match categorize(&block) {
        Err(WdlError::InvariantViolation { message }) => assert!(message.contains("a1")),
        other => panic!("Expected invariant violation, got {:?}", other),
    }

    let nested = Block::new(vec![
        conditional_on("flag", vec![add_call("a1", int_ident("x"), int_ident("y")).into()]),
        add_call("a2", int_ident("x"), int_ident("y")).into(),
    ]);
    assert!(matches!(
        categorize(&nested),
        Err(WdlError::InvariantViolation { .. })
    ));
    assert!(matches!(
        categorize(&Block::new(Vec::new())),
        Err(WdlError::InvariantViolation { .. })
    ));
}

#[test]
fn test_inner_body_of_all_expressions_is_unsupported() {
    let category = categorize(&Block::new(vec![decl("a", Expression::int(pos(), 1))])).unwrap();
    match category.inner_body() {
        Err(WdlError::UnsupportedOperation { category, .. }) => {
            assert_eq!(category, "AllExpressions")
        }
        other => panic!("Expected unsupported operation, got {:?}", other),
    }
}

#[test]
fn test_get_sub_block_nested_path() {
    let elements = sample_elements();
    let top = get_sub_block(&[2], &elements).unwrap();
    assert_eq!(categorize(&top).unwrap().name(), "ScatterFullBlock");

    let inner = get_sub_block(&[2, 0], &elements).unwrap();
    match categorize(&inner).unwrap() {
        Category::CallDirect { call, .. } => assert_eq!(call.name(), "a3"),
        other => panic!("Expected CallDirect, got {}", other),
    }
    let second = get_sub_block(&[2, 1], &elements).unwrap();
    assert_eq!(categorize(&second).unwrap().name(), "CallDirect");
}

#[test]
fn test_get_sub_block_errors() {
    let elements = sample_elements();
    assert!(matches!(
        get_sub_block(&[7], &elements),
        Err(WdlError::InvalidBlockPath { index: 7, .. })
    ));
    assert!(matches!(
        get_sub_block(&[2, 5], &elements),
        Err(WdlError::InvalidBlockPath { index: 5, .. })
    ));
    assert!(matches!(
        get_sub_block(&[0, 0], &elements),
        Err(WdlError::UnsupportedOperation { .. })
    ));
    assert!(get_sub_block(&[], &elements).is_err());
}

#[test]
fn test_closure_of_blocks() {
    let blocks = split_to_blocks(&sample_elements());

    let first = closure(&blocks[0]).unwrap();
    assert_eq!(first.keys().collect::<Vec<_>>(), vec!["n"]);
    assert_eq!(first["n"].wdl_type, Type::int());
    assert!(!first["n"].has_default);

    let second = closure(&blocks[1]).unwrap();
    assert_eq!(second.keys().collect::<Vec<_>>(), vec!["a1.result"]);

    // the loop variable and a3 are bound inside the scatter
    let third = closure(&blocks[2]).unwrap();
    assert_eq!(third.keys().collect::<Vec<_>>(), vec!["ns"]);
    assert_eq!(third["ns"].wdl_type, Type::array(Type::int()));

    let fourth = closure(&blocks[3]).unwrap();
    assert_eq!(fourth.keys().collect::<Vec<_>>(), vec!["y"]);
}

#[test]
fn test_closure_optional_has_default() {
    let block = Block::new(vec![decl(
        "v",
        Expression::apply(
            pos(),
            "select_first",
            vec![Expression::array(
                pos(),
                vec![
                    Expression::typed_ident(pos(), "maybe", Type::int().optional()),
                    Expression::int(pos(), 0),
                ],
            )],
        ),
    )]);
    let free = closure(&block).unwrap();
    assert!(free["maybe"].has_default);
    assert_eq!(free["maybe"].wdl_type, Type::int().optional());
}

#[test]
fn test_closure_section_scoping() {
    // scatter (i in ns) { Int sq = i * i }; Int total = length(sq)
    let scatter = scatter_over(
        "i",
        "ns",
        vec![decl(
            "sq",
            Expression::binary_op(pos(), BinaryOperator::Multiply, int_ident("i"), int_ident("i")),
        )],
    );
    let total = decl(
        "total",
        Expression::apply(
            pos(),
            "length",
            vec![Expression::typed_ident(pos(), "sq", Type::array(Type::int()))],
        ),
    );
    // i read after the scatter is the outer i, which is free
    let after = decl("again", int_ident("i"));
    let free = closure(&Block::new(vec![scatter, total, after])).unwrap();
    assert_eq!(free.keys().collect::<Vec<_>>(), vec!["ns", "i"]);
}

#[test]
fn test_closure_untyped_free_identifier() {
    let block = Block::new(vec![decl("a", Expression::ident(pos(), "mystery"))]);
    match closure(&block) {
        Err(WdlError::UnknownIdentifier { name, .. }) => assert_eq!(name, "mystery"),
        other => panic!("Expected unknown identifier, got {:?}", other),
    }
}

#[test]
fn test_outputs_widening() {
    let scatter = scatter_over("n", "ns", vec![decl("x", plus(int_ident("n"), Expression::int(pos(), 1)))]);
    let exposed = outputs(&Block::new(vec![scatter]));
    assert_eq!(exposed.get("x"), Some(&Type::array(Type::int())));
    assert!(!exposed.contains_key("n"));

    let cond = conditional_on("c", vec![decl("y", Expression::int(pos(), 1))]);
    let exposed = outputs(&Block::new(vec![cond]));
    assert_eq!(exposed.get("y"), Some(&Type::int().optional()));
}

#[test]
fn test_outputs_of_nested_sections_and_calls() {
    let nested = scatter_over(
        "i",
        "ns",
        vec![conditional_on(
            "flag",
            vec![add_call("a1", int_ident("i"), int_ident("i")).into()],
        )],
    );
    let exposed = outputs(&Block::new(vec![decl("k", Expression::int(pos(), 1)), nested]));
    assert_eq!(exposed.get("k"), Some(&Type::int()));
    assert_eq!(
        exposed.get("a1.result"),
        Some(&Type::array(Type::int().optional()))
    );

    let opt = Declaration::new(pos(), Type::int().optional(), "o", None);
    let cond = conditional_on("flag", vec![opt.into()]);
    let exposed = outputs(&Block::new(vec![cond]));
    assert_eq!(exposed.get("o"), Some(&Type::int().optional()));
}

#[test]
fn test_output_closure_and_passthrough_inputs() {
    let inputs = vec![
        Declaration::new(pos(), Type::int(), "n", None),
        Declaration::new(pos(), Type::string(), "label", None),
    ];
    let workflow_outputs = vec![
        Declaration::new(pos(), Type::int(), "n_out", Some(int_ident("n"))),
        Declaration::new(pos(), Type::int(), "sum", Some(call_output("a1", "result"))),
        Declaration::new(
            pos(),
            Type::int(),
            "twice",
            Some(plus(int_ident("sum"), int_ident("sum"))),
        ),
    ];
    let used = output_closure(&workflow_outputs);
    assert_eq!(used.iter().collect::<Vec<_>>(), vec!["n", "a1.result"]);

    let passthrough = inputs_used_as_outputs(&inputs, &workflow_outputs);
    assert_eq!(passthrough.iter().collect::<Vec<_>>(), vec!["n"]);

    assert!(is_simple_output(&workflow_outputs[0]));
    assert!(is_simple_output(&workflow_outputs[1]));
    assert!(!is_simple_output(&workflow_outputs[2]));
    assert_eq!(
        expr_inputs(workflow_outputs[2].expr.as_ref().unwrap()).len(),
        1
    );
}

#[test]
fn test_split_workflow() {
    let workflow = Workflow::new(
        pos(),
        "wf",
        vec![
            Declaration::new(pos(), Type::int(), "n", None),
            Declaration::new(pos(), Type::array(Type::int()), "ns", None),
            Declaration::new(pos(), Type::boolean(), "flag", Some(Expression::boolean(pos(), true))),
        ],
        sample_elements(),
        vec![Declaration::new(pos(), Type::int(), "out", Some(int_ident("z")))],
    );
    let split_wf = split(&workflow);
    assert_eq!(
        split_wf.inputs.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        vec!["n", "ns"]
    );
    assert_eq!(split_wf.inputs_with_defaults.len(), 1);
    assert_eq!(split_wf.inputs_with_defaults[0].name, "flag");
    assert_eq!(split_wf.blocks.len(), 4);
    assert_eq!(split_wf.outputs.len(), 1);
}
