// projeto: densefit
// file: src/neural/data.rs
// Dataset construction, CSV loading and mini-batching

use csv::ReaderBuilder;
use log::{debug, info};
use ndarray::{Array2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::Path;
use crate::neural::utils::{validate_input_data, TrainingError};

/// Inputs the one-unit example is trained on.
pub const HELLO_XS: [f64; 7] = [-1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
/// Targets for `HELLO_XS`; they lie exactly on `y = x - 2`.
pub const HELLO_YS: [f64; 7] = [-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0];

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Array2<f64>,
    targets: Array2<f64>,
}

impl Dataset {
    pub fn new(inputs: Array2<f64>, targets: Array2<f64>) -> Result<Self, TrainingError> {
        if inputs.nrows() != targets.nrows() {
            return Err(TrainingError::DataProcessing(format!(
                "inputs have {} rows but targets have {}",
                inputs.nrows(),
                targets.nrows()
            )));
        }
        validate_input_data(&inputs.view(), "inputs")?;
        validate_input_data(&targets.view(), "targets")?;

        Ok(Dataset { inputs, targets })
    }

    /// One input column and one target column.
    pub fn from_pairs(xs: &[f64], ys: &[f64]) -> Result<Self, TrainingError> {
        if xs.len() != ys.len() {
            return Err(TrainingError::DataProcessing(format!(
                "got {} inputs and {} targets",
                xs.len(),
                ys.len()
            )));
        }
        let inputs = Array2::from_shape_vec((xs.len(), 1), xs.to_vec())?;
        let targets = Array2::from_shape_vec((ys.len(), 1), ys.to_vec())?;
        Self::new(inputs, targets)
    }

    pub fn hello() -> Result<Self, TrainingError> {
        Self::from_pairs(&HELLO_XS, &HELLO_YS)
    }

    /// Reads a headed CSV where every row is `input_dim` inputs followed by
    /// `units` targets.
    pub fn from_csv<P: AsRef<Path>>(path: P, input_dim: usize, units: usize) -> Result<Self, TrainingError> {
        let path = path.as_ref();
        info!("📥 [Dataset] Loading {}", path.display());

        let width = input_dim + units;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        let mut rows = 0;

        for (line, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() != width {
                return Err(TrainingError::DataProcessing(format!(
                    "row {}: expected {} columns, found {}",
                    line + 1,
                    width,
                    record.len()
                )));
            }

            for (col, field) in record.iter().enumerate() {
                let value: f64 = field.parse().map_err(|_| {
                    TrainingError::DataProcessing(format!(
                        "row {}, column {}: '{}' is not a number",
                        line + 1,
                        col + 1,
                        field
                    ))
                })?;
                if col < input_dim {
                    inputs.push(value);
                } else {
                    targets.push(value);
                }
            }
            rows += 1;
        }

        if rows == 0 {
            return Err(TrainingError::DataProcessing(format!(
                "{} contains no data rows",
                path.display()
            )));
        }

        let dataset = Self::new(
            Array2::from_shape_vec((rows, input_dim), inputs)?,
            Array2::from_shape_vec((rows, units), targets)?,
        )?;
        info!("✅ [Dataset] Loaded {} samples", dataset.len());
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.targets.ncols()
    }

    pub fn inputs(&self) -> &Array2<f64> {
        &self.inputs
    }

    pub fn targets(&self) -> &Array2<f64> {
        &self.targets
    }

    /// Row indices grouped into batches; every row appears exactly once.
    pub fn batches<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        shuffle: bool,
        rng: &mut R,
    ) -> Result<Vec<Vec<usize>>, TrainingError> {
        if batch_size == 0 {
            return Err(TrainingError::ModelConfiguration("batch_size must be at least 1".to_string()));
        }

        let mut indices: Vec<usize> = (0..self.len()).collect();
        if shuffle {
            indices.shuffle(rng);
        }

        let batches: Vec<Vec<usize>> = indices.chunks(batch_size).map(|c| c.to_vec()).collect();
        debug!("🔧 [Dataset] {} samples -> {} batches of up to {}", self.len(), batches.len(), batch_size);
        Ok(batches)
    }

    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array2<f64>) {
        (
            self.inputs.select(Axis(0), indices),
            self.targets.select(Axis(0), indices),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;

    #[test]
    fn test_hello_dataset() {
        let ds = Dataset::hello().unwrap();
        assert_eq!(ds.len(), 7);
        assert_eq!(ds.input_dim(), 1);
        assert_eq!(ds.output_dim(), 1);
        for (x, y) in ds.inputs().iter().zip(ds.targets().iter()) {
            assert_eq!(*y, x - 2.0);
        }
    }

    #[test]
    fn test_length_parity_is_enforced() {
        let err = Dataset::from_pairs(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, TrainingError::DataProcessing(_)));

        let inputs = Array2::zeros((3, 1));
        let targets = Array2::zeros((2, 1));
        assert!(Dataset::new(inputs, targets).is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        assert!(Dataset::from_pairs(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
        assert!(Dataset::from_pairs(&[], &[]).is_err());
    }

    #[test]
    fn test_batches_cover_every_row_once() {
        let ds = Dataset::hello().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let batches = ds.batches(3, true, &mut rng).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 1);

        let mut seen: Vec<usize> = batches.concat();
        seen.sort_unstable();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());

        let ordered = ds.batches(32, false, &mut rng).unwrap();
        assert_eq!(ordered, vec![(0..7).collect::<Vec<_>>()]);

        assert!(ds.batches(0, false, &mut rng).is_err());
    }

    #[test]
    fn test_select_keeps_rows_aligned() {
        let ds = Dataset::hello().unwrap();
        let (x, y) = ds.select(&[6, 0]);
        assert_eq!(x.column(0).to_vec(), vec![5.0, -1.0]);
        assert_eq!(y.column(0).to_vec(), vec![3.0, -3.0]);
    }

    #[test]
    fn test_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x1,x2,y").unwrap();
        writeln!(file, "1.0, 2.0, 3.0").unwrap();
        writeln!(file, "4.0, 5.0, 9.0").unwrap();
        file.flush().unwrap();

        let ds = Dataset::from_csv(file.path(), 2, 1).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.input_dim(), 2);
        assert_eq!(ds.inputs()[[1, 1]], 5.0);
        assert_eq!(ds.targets()[[1, 0]], 9.0);
    }

    #[test]
    fn test_from_csv_reports_bad_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        writeln!(file, "1.0,abc").unwrap();
        file.flush().unwrap();

        let err = Dataset::from_csv(file.path(), 1, 1).unwrap_err();
        assert!(err.to_string().contains("row 1"));

        let mut short = tempfile::NamedTempFile::new().unwrap();
        writeln!(short, "x,y").unwrap();
        short.flush().unwrap();
        assert!(Dataset::from_csv(short.path(), 1, 1).is_err());
    }
}
