//! Classification statistics from a confusion matrix.

use ndarray::{Array2, ArrayView2, Axis};
use std::fmt::Write;

use crate::core::{NetError, NetResult};
use crate::utils::argmax;

/// Confusion matrix with rows indexed by the actual class and columns by the
/// predicted class.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    confusion: Array2<usize>,
}

impl Evaluation {
    #[must_use]
    pub fn new(num_classes: usize) -> Self {
        Self {
            confusion: Array2::zeros((num_classes, num_classes)),
        }
    }

    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.confusion.nrows()
    }

    #[must_use]
    pub fn confusion(&self) -> &Array2<usize> {
        &self.confusion
    }

    /// Record one prediction.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ShapeMismatch`] if either class is out of range.
    pub fn record(&mut self, actual: usize, predicted: usize) -> NetResult<()> {
        let n = self.num_classes();
        if actual >= n || predicted >= n {
            return Err(NetError::ShapeMismatch(format!(
                "class pair ({actual}, {predicted}) outside {n} classes"
            )));
        }
        self.confusion[[actual, predicted]] += 1;
        Ok(())
    }

    /// Record a batch of class scores, one row per example. The prediction
    /// is the highest-scoring column.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ShapeMismatch`] if the shapes disagree.
    pub fn record_batch(&mut self, labels: &[u8], scores: ArrayView2<f32>) -> NetResult<()> {
        if scores.nrows() != labels.len() || scores.ncols() != self.num_classes() {
            return Err(NetError::ShapeMismatch(format!(
                "{} labels against scores of shape {:?}",
                labels.len(),
                scores.shape()
            )));
        }
        for (row, &label) in scores.axis_iter(Axis(0)).zip(labels) {
            let predicted = argmax(row.iter().copied()).unwrap_or(0);
            self.record(usize::from(label), predicted)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.confusion.sum()
    }

    fn correct(&self) -> usize {
        self.confusion.diag().sum()
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Fraction of predictions of `class` that were right.
    #[must_use]
    pub fn precision(&self, class: usize) -> f64 {
        let predicted = self.confusion.column(class).sum();
        ratio(self.confusion[[class, class]], predicted)
    }

    /// Fraction of examples of `class` that were found.
    #[must_use]
    pub fn recall(&self, class: usize) -> f64 {
        let actual = self.confusion.row(class).sum();
        ratio(self.confusion[[class, class]], actual)
    }

    #[must_use]
    pub fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Macro average over classes that occur as label or prediction.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn macro_f1(&self) -> f64 {
        let present: Vec<usize> = (0..self.num_classes())
            .filter(|&c| self.confusion.row(c).sum() + self.confusion.column(c).sum() > 0)
            .collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().map(|&c| self.f1(c)).sum::<f64>() / present.len() as f64
    }

    /// Human-readable report with summary figures and the confusion matrix.
    #[must_use]
    pub fn stats(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Examples:  {}", self.total());
        let _ = writeln!(out, "Accuracy:  {:.4}", self.accuracy());
        let _ = writeln!(out, "Macro F1:  {:.4}", self.macro_f1());
        let _ = writeln!(out);
        let _ = writeln!(out, "class  precision  recall  f1");
        for c in 0..self.num_classes() {
            let _ = writeln!(
                out,
                "{c:>5}  {:>9.4}  {:>6.4}  {:>6.4}",
                self.precision(c),
                self.recall(c),
                self.f1(c)
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Confusion matrix (rows = actual, columns = predicted):");
        for row in self.confusion.rows() {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>5}")).collect();
            let _ = writeln!(out, "{}", cells.join(""));
        }
        out
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample_eval() -> Evaluation {
        let mut eval = Evaluation::new(3);
        // actual 0: two right, one predicted as 1
        eval.record(0, 0).unwrap();
        eval.record(0, 0).unwrap();
        eval.record(0, 1).unwrap();
        // actual 1: one right
        eval.record(1, 1).unwrap();
        // actual 2: predicted as 0
        eval.record(2, 0).unwrap();
        eval
    }

    #[test]
    fn test_accuracy() {
        let eval = sample_eval();
        assert_eq!(eval.total(), 5);
        assert_abs_diff_eq!(eval.accuracy(), 0.6);
    }

    #[test]
    fn test_precision_recall_f1() {
        let eval = sample_eval();
        assert_abs_diff_eq!(eval.precision(0), 2.0 / 3.0);
        assert_abs_diff_eq!(eval.recall(0), 2.0 / 3.0);
        assert_abs_diff_eq!(eval.precision(1), 0.5);
        assert_abs_diff_eq!(eval.recall(1), 1.0);
        assert_abs_diff_eq!(eval.f1(1), 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval.f1(2), 0.0);
    }

    #[test]
    fn test_record_batch_uses_argmax() {
        let mut eval = Evaluation::new(2);
        let scores = array![[0.9, 0.1], [0.3, 0.7], [0.6, 0.4]];
        eval.record_batch(&[0, 1, 1], scores.view()).unwrap();
        assert_eq!(eval.confusion()[[0, 0]], 1);
        assert_eq!(eval.confusion()[[1, 1]], 1);
        assert_eq!(eval.confusion()[[1, 0]], 1);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut eval = Evaluation::new(2);
        assert!(eval.record(2, 0).is_err());
        let scores = array![[0.9, 0.1, 0.0]];
        assert!(eval.record_batch(&[0], scores.view()).is_err());
    }

    #[test]
    fn test_empty_is_zero() {
        let eval = Evaluation::new(4);
        assert_eq!(eval.accuracy(), 0.0);
        assert_eq!(eval.macro_f1(), 0.0);
    }

    #[test]
    fn test_stats_report() {
        let report = sample_eval().stats();
        assert!(report.contains("Accuracy:  0.6000"));
        assert!(report.contains("Confusion matrix"));
    }
}
