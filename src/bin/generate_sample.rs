use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Days, NaiveDate};
use parquet::arrow::ArrowWriter;

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Land of Toys Inc.", "USA", "NA"),
    ("Reims Collectables", "France", "EMEA"),
    ("Lyon Souveniers", "France", "EMEA"),
    ("Toys4GrownUps.com", "USA", "NA"),
    ("Corporate Gift Ideas Co.", "USA", "NA"),
    ("Euro Shopping Channel", "Spain", "EMEA"),
    ("Australian Collectors, Co.", "Australia", "APAC"),
    ("Mini Gifts Distributors Ltd.", "USA", "NA"),
    ("Dragon Souveniers, Ltd.", "Singapore", "APAC"),
    ("Oulu Toy Supplies, Inc.", "Finland", "EMEA"),
];

const PRODUCT_LINES: &[(&str, f64)] = &[
    ("Classic Cars", 120.0),
    ("Vintage Cars", 90.0),
    ("Motorcycles", 95.0),
    ("Trucks and Buses", 105.0),
    ("Planes", 85.0),
    ("Ships", 75.0),
    ("Trains", 60.0),
];

const STATUSES: &[&str] = &["Shipped", "Shipped", "Shipped", "Shipped", "Resolved", "Cancelled", "On Hold"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// One clean order line.
struct Line {
    order: i64,
    date: NaiveDate,
    customer: usize,
    product_line: usize,
    product_code: String,
    status: &'static str,
    quantity: i64,
    price: f64,
    msrp: f64,
}

impl Line {
    fn sales(&self) -> f64 {
        (self.quantity as f64 * self.price * 100.0).round() / 100.0
    }

    fn deal_size(&self) -> &'static str {
        match self.sales() {
            s if s < 3000.0 => "Small",
            s if s < 7000.0 => "Medium",
            _ => "Large",
        }
    }
}

fn generate_lines(rng: &mut SimpleRng) -> Result<Vec<Line>> {
    let start = NaiveDate::from_ymd_opt(2003, 1, 6).context("start date")?;
    let mut lines = Vec::new();
    for n in 0..300 {
        let date = start
            .checked_add_days(Days::new(n * 3 + rng.below(3) as u64))
            .context("order date out of range")?;
        let customer = rng.below(CUSTOMERS.len());
        let status = STATUSES[rng.below(STATUSES.len())];
        for _ in 0..1 + rng.below(4) {
            let product_line = rng.below(PRODUCT_LINES.len());
            let msrp = PRODUCT_LINES[product_line].1 + rng.between(-20.0, 40.0).round();
            lines.push(Line {
                order: 10100 + n as i64,
                date,
                customer,
                product_line,
                product_code: format!("S{}_{}", 10 + product_line * 8, 1000 + rng.below(9000)),
                status,
                quantity: 20 + rng.below(31) as i64,
                price: (msrp * rng.between(0.8, 1.05) * 100.0).round() / 100.0,
                msrp,
            });
        }
    }
    Ok(lines)
}

const HEADER: &[&str] = &[
    "ORDERNUMBER",
    "QUANTITYORDERED",
    "PRICEEACH",
    "SALES",
    "ORDERDATE",
    "STATUS",
    "QTR_ID",
    "MONTH_ID",
    "YEAR_ID",
    "PRODUCTLINE",
    "MSRP",
    "PRODUCTCODE",
    "CUSTOMERNAME",
    "COUNTRY",
    "TERRITORY",
    "DEALSIZE",
];

/// CSV in the classic export layout, with the kinds of dirt the cleaning
/// pipeline is meant to absorb: thousands separators, stray padding, blank
/// names, zero quantities, repeated lines and a few unreadable dates.
fn write_csv(lines: &[Line], path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(HEADER)?;
    let mut written = 0;
    for (i, line) in lines.iter().enumerate() {
        let (customer, country, territory) = CUSTOMERS[line.customer];
        let sales = line.sales();
        let sales_text = if i % 17 == 0 && sales >= 1000.0 {
            let cents = (sales * 100.0).round() as i64;
            format!("{},{:03}.{:02}", cents / 100_000, (cents / 100) % 1000, cents % 100)
        } else {
            format!("{sales:.2}")
        };
        let date_text = match i % 29 {
            0 => "unknown".to_string(),
            7 => line.date.format("%Y-%m-%d").to_string(),
            _ => format!("{} 0:00", line.date.format("%-m/%-d/%Y")),
        };
        let record = [
            line.order.to_string(),
            if i % 23 == 0 { "0".into() } else { line.quantity.to_string() },
            format!("{:.2}", line.price),
            sales_text,
            date_text,
            line.status.to_string(),
            ((line.date.month() - 1) / 3 + 1).to_string(),
            line.date.month().to_string(),
            line.date.year().to_string(),
            PRODUCT_LINES[line.product_line].0.to_string(),
            format!("{:.0}", line.msrp),
            line.product_code.clone(),
            if i % 31 == 0 { String::new() } else { customer.to_string() },
            if i % 13 == 0 { format!(" {} ", country.to_lowercase()) } else { country.to_string() },
            territory.to_string(),
            line.deal_size().to_string(),
        ];
        writer.write_record(&record)?;
        written += 1;
        if i % 41 == 0 {
            writer.write_record(&record)?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Parquet with proper column types and no dirt.
fn write_parquet(lines: &[Line], path: &Path) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;
    let ints = |f: &dyn Fn(&Line) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(lines.iter().map(f).collect::<Vec<_>>()))
    };
    let floats = |f: &dyn Fn(&Line) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(lines.iter().map(f).collect::<Vec<_>>()))
    };
    let strings = |f: &dyn Fn(&Line) -> String| -> ArrayRef {
        Arc::new(StringArray::from(lines.iter().map(f).collect::<Vec<_>>()))
    };

    let columns: Vec<(&str, ArrayRef)> = vec![
        ("ORDERNUMBER", ints(&|l| l.order)),
        ("QUANTITYORDERED", ints(&|l| l.quantity)),
        ("PRICEEACH", floats(&|l| l.price)),
        ("SALES", floats(&|l| l.sales())),
        (
            "ORDERDATE",
            Arc::new(Date32Array::from(
                lines
                    .iter()
                    .map(|l| l.date.signed_duration_since(epoch).num_days() as i32)
                    .collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        ("STATUS", strings(&|l| l.status.to_string())),
        ("QTR_ID", ints(&|l| ((l.date.month() - 1) / 3 + 1) as i64)),
        ("MONTH_ID", ints(&|l| l.date.month() as i64)),
        ("YEAR_ID", ints(&|l| l.date.year() as i64)),
        ("PRODUCTLINE", strings(&|l| PRODUCT_LINES[l.product_line].0.to_string())),
        ("MSRP", floats(&|l| l.msrp)),
        ("PRODUCTCODE", strings(&|l| l.product_code.clone())),
        ("CUSTOMERNAME", strings(&|l| CUSTOMERS[l.customer].0.to_string())),
        ("COUNTRY", strings(&|l| CUSTOMERS[l.customer].1.to_string())),
        ("TERRITORY", strings(&|l| CUSTOMERS[l.customer].2.to_string())),
        ("DEALSIZE", strings(&|l| l.deal_size().to_string())),
    ];

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), false))
            .collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(
        schema.clone(),
        columns.into_iter().map(|(_, array)| array).collect(),
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let lines = generate_lines(&mut rng)?;

    let csv_path = out_dir.join("sales_data_sample.csv");
    let written = write_csv(&lines, &csv_path)?;
    log::info!("wrote {written} rows to {}", csv_path.display());

    let parquet_path = out_dir.join("sales_data_sample.parquet");
    write_parquet(&lines, &parquet_path)?;

    println!(
        "Wrote {} order lines to {} ({} rows incl. dirt) and {}",
        lines.len(),
        csv_path.display(),
        written,
        parquet_path.display()
    );
    Ok(())
}
