use serde::{Deserialize, Serialize};

/// A unit of the grid whose full solve can diffuse a threat.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ObjectiveType {
    Row,
    Col,
    Box,
}

impl ObjectiveType {
    /// Power-up slots map onto objectives: 0 row, 1 column, 2 box.
    pub fn from_slot(slot_index: usize) -> Option<Self> {
        match slot_index {
            0 => Some(Self::Row),
            1 => Some(Self::Col),
            2 => Some(Self::Box),
            _ => None,
        }
    }
}

/// Side lengths of a square grid made of square boxes (9x9 with 3x3 boxes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub side: usize,
    pub box_side: usize,
}

impl Geometry {
    pub fn for_len(len: usize) -> Option<Self> {
        let side = exact_sqrt(len)?;
        let box_side = exact_sqrt(side)?;
        (side > 0).then_some(Self { side, box_side })
    }

    /// Cell indices of the objective containing `index`.
    pub fn cells(&self, objective: ObjectiveType, index: usize) -> Vec<usize> {
        let row = index / self.side;
        let col = index % self.side;
        match objective {
            ObjectiveType::Row => (0..self.side).map(|c| row * self.side + c).collect(),
            ObjectiveType::Col => (0..self.side).map(|r| r * self.side + col).collect(),
            ObjectiveType::Box => {
                let top = row - row % self.box_side;
                let left = col - col % self.box_side;
                (0..self.box_side)
                    .flat_map(|r| (0..self.box_side).map(move |c| (top + r) * self.side + left + c))
                    .collect()
            }
        }
    }
}

fn exact_sqrt(n: usize) -> Option<usize> {
    let root = (n as f64).sqrt().round() as usize;
    (root * root == n).then_some(root)
}
