use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;

use super::IndexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Manhattan,
    Cosine,
}

impl Metric {
    /// Accepts the metric names a fitted scikit-learn `NearestNeighbors`
    /// reports, including `minkowski` with its `p` parameter.
    pub fn from_name(name: &str, p: Option<f64>) -> Result<Self, IndexError> {
        match name.to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "manhattan" | "cityblock" | "l1" => Ok(Metric::Manhattan),
            "cosine" => Ok(Metric::Cosine),
            "minkowski" => match p.unwrap_or(2.0) {
                p if p == 2.0 => Ok(Metric::Euclidean),
                p if p == 1.0 => Ok(Metric::Manhattan),
                p => Err(IndexError::UnknownMetric(format!("minkowski p={}", p))),
            },
            other => Err(IndexError::UnknownMetric(other.to_string())),
        }
    }

    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Metric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            Metric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            Metric::Cosine => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
                let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    // Undefined for a zero vector; treat it as unrelated.
                    1.0
                } else {
                    1.0 - dot / (na * nb)
                }
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Cosine => "cosine",
        };
        f.write_str(name)
    }
}

/// Parameters of the offline-fitted model (`model.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelParams {
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default)]
    pub p: Option<f64>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            p: None,
        }
    }
}

fn default_metric() -> String {
    "euclidean".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

/// Brute-force nearest neighbours over the rows of a dense matrix.
#[derive(Debug, Clone)]
pub struct NearestNeighbors {
    metric: Metric,
    rows: Vec<Vec<f64>>,
}

impl NearestNeighbors {
    pub fn fit(rows: Vec<Vec<f64>>, metric: Metric) -> Self {
        Self { metric, rows }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// The `k` rows closest to row `row`, nearest first. The query row itself
    /// is at distance 0 and sorts ahead of any other row at distance 0; other
    /// ties keep ascending row order.
    pub fn kneighbors_of_row(&self, row: usize, k: usize) -> Vec<Neighbor> {
        let query = match self.rows.get(row) {
            Some(q) => q,
            None => return Vec::new(),
        };

        let mut neighbors: Vec<Neighbor> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| Neighbor {
                row: i,
                distance: if i == row { 0.0 } else { self.metric.distance(query, r) },
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (a.row != row).cmp(&(b.row != row)))
                .then_with(|| a.row.cmp(&b.row))
        });
        neighbors.truncate(k);
        neighbors
    }
}
