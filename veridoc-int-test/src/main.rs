use veridoc::errors::VeridocResult;
use veridoc::{doc, query};
use veridoc_int_test::test_util::{create_test_context, evasao_row};

fn main() -> VeridocResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context();
    let db = ctx.db();

    let count = 100_000i64;

    let start = std::time::Instant::now();
    for index in 0..count {
        db.insert("evasao_dados", evasao_row("Engenharia", 2000 + (index % 25), 1))?;
    }
    let elapsed = start.elapsed();
    println!("Inserted {} documents in {:?}", count, elapsed);

    let start = std::time::Instant::now();
    let rows = db.find("evasao_dados", &query! { ano: 2010 })?;
    println!("Found {} documents in {:?} (cold)", rows.len(), start.elapsed());

    let start = std::time::Instant::now();
    let rows = db.find("evasao_dados", &query! { ano: 2010 })?;
    println!("Found {} documents in {:?} (cached)", rows.len(), start.elapsed());

    let start = std::time::Instant::now();
    let modified = db.update_many(
        "evasao_dados",
        &query! { ano: 2010 },
        doc! { turno: "integral" },
    )?;
    println!("Updated {} documents in {:?}", modified, start.elapsed());

    let start = std::time::Instant::now();
    let report = db.migrate("evasao_dados", &query! {}, |document| {
        let mut migrated = document.clone();
        migrated.put("reviewed", true)?;
        Ok(migrated)
    })?;
    println!(
        "Migrated {} documents in {:?} ({} failures)",
        report.migrated,
        start.elapsed(),
        report.failures.len()
    );

    let start = std::time::Instant::now();
    let removed = db.delete_many("evasao_dados", &query! {})?;
    println!("Removed {} documents in {:?}", removed, start.elapsed());

    db.disconnect();
    Ok(())
}
