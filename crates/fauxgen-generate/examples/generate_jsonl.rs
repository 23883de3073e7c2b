use std::env;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::rc::Rc;

use fauxgen_generate::{
    CountRange, Dictionary, Distribution, DistributionKind, Emitter, FieldSpec, FieldType,
    GeneratedValue, Generator, Interval, JsonLinesEmitter, PrimaryKey, PrimaryKeyKind,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mut count: u64 = 5;
    let mut dictionary_dir: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--count" => count = args.next().ok_or("missing --count value")?.parse()?,
            "--dictionary" => dictionary_dir = args.next().map(PathBuf::from),
            _ => return Err(format!("unexpected argument {arg:?}").into()),
        }
    }

    let dictionary = Rc::new(match dictionary_dir {
        Some(dir) => Dictionary::with_root(dir),
        None => Dictionary::builtin(),
    });

    let address = Rc::new(Generator::new("Address", PrimaryKey::default(), false));
    address.with_field(
        "street",
        FieldSpec::new(FieldType::dict("street_address", Rc::clone(&dictionary))?),
    );
    address.with_field("zip", FieldSpec::new(FieldType::text(5)?));

    let person = Generator::new("Person", PrimaryKey::new("id", PrimaryKeyKind::Serial), false);
    person.with_field(
        "name",
        FieldSpec::new(FieldType::dict("full_name", Rc::clone(&dictionary))?),
    );
    person.with_field("age", FieldSpec::new(FieldType::integer(18, 90)?));
    person.with_field(
        "tier",
        FieldSpec::new(FieldType::Distribution(Distribution::new(
            DistributionKind::Percent,
            vec![
                Interval::weighted(FieldType::literal(GeneratedValue::Text("gold".into())), 20.0),
                Interval::weighted(FieldType::literal(GeneratedValue::Text("basic".into())), 80.0),
            ],
        )?)),
    );
    person.with_entity_field("addresses", address, Some(CountRange::new(1, 3)?));
    person.with_static_field("source", GeneratedValue::Text("example".into()));

    let mut emitter = JsonLinesEmitter::new(BufWriter::new(io::stdout().lock()));
    emitter.init()?;
    person.generate(count, &mut emitter)?;
    emitter.finalize()?;

    eprintln!(
        "records={} bytes={}",
        emitter.records_written(),
        emitter.bytes_written()
    );
    Ok(())
}
