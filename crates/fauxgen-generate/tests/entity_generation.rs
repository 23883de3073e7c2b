use std::rc::Rc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use fauxgen_generate::{
    CountRange, Distribution, DistributionKind, Emitter, EntityResult, FieldSpec, FieldType,
    GeneratedValue, GenerationError, Generator, Interval, JsonLinesEmitter, MemoryEmitter,
    PrimaryKey, PrimaryKeyKind,
};

fn line_item() -> Rc<Generator> {
    let item = Rc::new(Generator::new(
        "LineItem",
        PrimaryKey::new("sku", PrimaryKeyKind::Serial),
        false,
    ));
    item.with_field(
        "quantity",
        FieldSpec::new(FieldType::integer(1, 5).expect("valid range")),
    );
    item
}

fn order(item: Rc<Generator>) -> Generator {
    let order = Generator::new("Order", PrimaryKey::default(), false);
    let tier = Distribution::new(
        DistributionKind::Percent,
        vec![
            Interval::weighted(FieldType::literal(GeneratedValue::Text("gold".into())), 20.0),
            Interval::weighted(FieldType::literal(GeneratedValue::Text("basic".into())), 80.0),
        ],
    )
    .expect("valid distribution");
    order.with_field("tier", FieldSpec::new(FieldType::Distribution(tier)));
    order.with_entity_field(
        "items",
        item,
        Some(CountRange::new(1, 3).expect("valid count")),
    );
    order
}

#[test]
fn nested_lists_carry_the_parent_key() {
    let order = order(line_item());
    let mut emitter = MemoryEmitter::new();
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let records = order
        .generate_with_rng(5, &mut emitter, &mut rng)
        .expect("generate orders");
    assert_eq!(records.len(), 5);

    for record in &records {
        let items = record
            .get("items")
            .and_then(GeneratedValue::as_list)
            .expect("items list");
        assert!((1..=3).contains(&items.len()));
        for item in items {
            let item = item.as_entity().expect("nested record");
            assert_eq!(item.parent(), record.id());
        }
    }

    // children are emitted before the order that holds them
    let mut pending_children = 0;
    while let Some((entity_type, _)) = emitter.shift_typed() {
        if entity_type == "LineItem" {
            pending_children += 1;
        } else {
            assert_eq!(entity_type, "Order");
            assert!(pending_children > 0);
            pending_children = 0;
        }
    }
}

#[test]
fn percent_tiers_match_their_share_exactly() {
    let order = order(line_item());
    let mut emitter = MemoryEmitter::new();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let records = order
        .generate_with_rng(10, &mut emitter, &mut rng)
        .expect("generate orders");
    let gold = records
        .iter()
        .filter(|record| record.get("tier").and_then(GeneratedValue::as_str) == Some("gold"))
        .count();
    assert_eq!(gold, 2);
}

#[test]
fn nested_values_are_fresh_per_record() {
    let inner = Rc::new(Generator::new("Token", PrimaryKey::default(), false));
    inner.with_field(
        "secret",
        FieldSpec::new(FieldType::text(16).expect("valid length")),
    );
    let outer = Generator::new("Session", PrimaryKey::default(), false);
    outer.with_entity_field("token", inner, None);

    let mut emitter = MemoryEmitter::new();
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let records = outer
        .generate_with_rng(2, &mut emitter, &mut rng)
        .expect("generate sessions");

    let secret = |record: &EntityResult| {
        record
            .get("token")
            .and_then(GeneratedValue::as_entity)
            .and_then(|token| token.get("secret"))
            .cloned()
    };
    assert_ne!(secret(&records[0]), secret(&records[1]));
}

#[test]
fn json_lines_sink_receives_every_record() {
    let order = order(line_item());
    let mut emitter = JsonLinesEmitter::new(Vec::new());
    let mut rng = ChaCha8Rng::seed_from_u64(8);

    emitter.init().expect("init");
    let records = order
        .generate_with_rng(4, &mut emitter, &mut rng)
        .expect("generate orders");
    emitter.finalize().expect("finalize");

    let nested: usize = records
        .iter()
        .filter_map(|record| record.get("items").and_then(GeneratedValue::as_list))
        .map(<[GeneratedValue]>::len)
        .sum();
    assert_eq!(emitter.records_written() as usize, records.len() + nested);

    let output = String::from_utf8(emitter.into_inner()).expect("utf8");
    for line in output.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("json line");
        let entity_type = value.get("$type").and_then(|v| v.as_str()).expect("type tag");
        assert!(entity_type == "Order" || entity_type == "LineItem");
    }
}

#[test]
fn emitter_failures_abort_generation() {
    struct Failing;

    impl Emitter for Failing {
        fn init(&mut self) -> Result<(), fauxgen_generate::EmitterError> {
            Ok(())
        }

        fn emit(
            &mut self,
            _record: &EntityResult,
            _entity_type: &str,
        ) -> Result<(), fauxgen_generate::EmitterError> {
            Err(fauxgen_generate::EmitterError::Rejected("disk full".to_string()))
        }

        fn next_emitter(
            &mut self,
            _receiver: Option<&str>,
            _field_key: &str,
            _is_multi_valued: bool,
        ) -> &mut dyn Emitter {
            self
        }

        fn finalize(&mut self) -> Result<(), fauxgen_generate::EmitterError> {
            Ok(())
        }
    }

    let order = order(line_item());
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = order
        .generate_with_rng(3, &mut Failing, &mut rng)
        .expect_err("sink failure");
    assert!(matches!(err, GenerationError::Emitter(_)));
}
