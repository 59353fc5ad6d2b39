use serde::Serialize;

/// Number of equal-width power bands.
pub const BAND_COUNT: usize = 10;

/// Upper edges of the ten bands, ascending.
///
/// Band `i` covers `(edges[i-1], edges[i]]`; band 0 covers `[0, edges[0]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandEdges {
    edges: [f64; BAND_COUNT],
}

impl BandEdges {
    /// `edges[k] = global_max * (k + 1) / 10`.
    pub fn from_max(global_max: f64) -> Self {
        let mut edges = [0.0; BAND_COUNT];
        for (k, edge) in edges.iter_mut().enumerate() {
            *edge = global_max * (k + 1) as f64 / BAND_COUNT as f64;
        }
        // The top edge must be the maximum itself, not a rounded product of it
        edges[BAND_COUNT - 1] = global_max;
        Self { edges }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.edges
    }

    pub fn upper(&self, band: usize) -> f64 {
        self.edges[band.min(BAND_COUNT - 1)]
    }

    /// Lower bound of a band: the previous edge, or 0 for band 0.
    pub fn lower(&self, band: usize) -> f64 {
        match band.min(BAND_COUNT - 1) {
            0 => 0.0,
            b => self.edges[b - 1],
        }
    }

    pub fn max(&self) -> f64 {
        self.edges[BAND_COUNT - 1]
    }

    /// Smallest band whose upper edge is `>= value`.
    ///
    /// Non-positive values land in band 0; anything above the top edge
    /// (rounding at the top) is clamped to the last band.
    pub fn band_of(&self, value: f64) -> usize {
        if value <= 0.0 {
            return 0;
        }
        self.edges
            .iter()
            .position(|&edge| value <= edge)
            .unwrap_or(BAND_COUNT - 1)
    }
}
