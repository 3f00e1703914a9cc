//! Parquet Interchange
//!
//! Reads tick files into the id space of caller-owned dictionaries and
//! writes synthetic tick files and TWAP reports back out with names.

pub mod reader;
pub mod writer;

pub use reader::{find_parquet_files, read_many_parquet_files, read_parquet_ticks};
pub use writer::{tick_schema, twap_schema, write_parquet_ticks, TwapParquetWriter, ROW_GROUP_ROWS};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twap::dictionary::Dictionary;
    use crate::twap::source::RowSink;
    use crate::twap::types::{InputRow, OutputRow};
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use tempfile::TempDir;

    fn sample(providers: &mut Dictionary, symbols: &mut Dictionary) -> Vec<InputRow> {
        (0..200)
            .map(|i| {
                let p = providers.id_for(&format!("provider{}", i % 3));
                let s = symbols.id_for(&format!("symbol{}", i % 7));
                InputRow::new(1_000_000_000_000 + i * 1_000_000, p, s, (1 + i % 17) as f64)
            })
            .collect()
    }

    #[test]
    fn test_tick_file_round_trip_through_fresh_dictionaries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ticks.parquet");
        let (mut providers, mut symbols) = (Dictionary::new(), Dictionary::new());
        let rows = sample(&mut providers, &mut symbols);
        write_parquet_ticks(&path, &rows, &providers, &symbols).unwrap();

        let (mut p2, mut s2) = (Dictionary::new(), Dictionary::new());
        let mut back = Vec::new();
        let count = read_parquet_ticks(&path, &mut p2, &mut s2, 64, |row| {
            back.push(row);
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 200);
        assert_eq!(back.len(), rows.len());
        for (a, b) in rows.iter().zip(&back) {
            assert_eq!(a.time_nanos, b.time_nanos);
            assert_eq!(a.price, b.price);
            assert_eq!(providers.name_for(a.provider_id), p2.name_for(b.provider_id));
            assert_eq!(symbols.name_for(a.symbol_id), s2.name_for(b.symbol_id));
        }
        assert_eq!(p2.len(), 3);
        assert_eq!(s2.len(), 7);
    }

    #[test]
    fn test_find_parquet_files_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["test_000000002.parquet", "notes.txt", "test_000000000.parquet"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let files = find_parquet_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["test_000000000.parquet", "test_000000002.parquet"]);
    }

    #[test]
    #[should_panic(expected = "timestamps not monotonic")]
    fn test_many_files_must_be_time_ordered() {
        let dir = TempDir::new().unwrap();
        let (mut providers, mut symbols) = (Dictionary::new(), Dictionary::new());
        let rows = sample(&mut providers, &mut symbols);
        let first = dir.path().join("a.parquet");
        let second = dir.path().join("b.parquet");
        write_parquet_ticks(&first, &rows, &providers, &symbols).unwrap();
        write_parquet_ticks(&second, &rows, &providers, &symbols).unwrap();

        let _ = read_many_parquet_files(&[first, second], &mut providers, &mut symbols, 1024, |_| Ok(()));
    }

    #[test]
    fn test_twap_writer_flushes_in_batches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("twap.parquet");
        let providers = Dictionary::from_names(["provider0", "provider1"]);
        let symbols = Dictionary::from_names(["symbolA"]);

        let mut writer = TwapParquetWriter::create(&path, &providers, &symbols, 2).unwrap();
        writer.accept(OutputRow::new(15, 0, 0, 1.5)).unwrap();
        writer.accept(OutputRow::new(15, 1, 0, 2.5)).unwrap();
        assert_eq!(writer.rows_written(), 2);
        writer.accept(OutputRow::new(30, 1, 0, f64::NAN)).unwrap();
        assert_eq!(writer.close().unwrap(), 3);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let mut providers_out = Vec::new();
        let mut times = Vec::new();
        let mut twaps = Vec::new();
        for batch in reader {
            let batch = batch.unwrap();
            let p = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
            let t = batch.column(2).as_any().downcast_ref::<Int64Array>().unwrap();
            let v = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
            for i in 0..batch.num_rows() {
                providers_out.push(p.value(i).to_string());
                times.push(t.value(i));
                twaps.push(v.value(i));
            }
        }
        assert_eq!(providers_out, vec!["provider0", "provider1", "provider1"]);
        assert_eq!(times, vec![15, 15, 30]);
        assert_eq!(&twaps[..2], &[1.5, 2.5]);
        assert!(twaps[2].is_nan());
    }
}
