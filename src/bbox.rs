use serde::{Deserialize, Serialize};

/// How the four coordinates of a [`BoundingBox`] are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxMode {
    /// `[x_min, y_min, width, height]` in absolute pixels (COCO).
    #[serde(rename = "XYWH_ABS")]
    XywhAbs,
    /// `[x_min, y_min, x_max, y_max]` in absolute pixels (VOC and CSV).
    #[serde(rename = "XYXY_ABS")]
    XyxyAbs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub coords: [f64; 4],
    pub mode: BoxMode,
}

impl BoundingBox {
    pub fn xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            coords: [x, y, width, height],
            mode: BoxMode::XywhAbs,
        }
    }

    pub fn xyxy(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            coords: [x0, y0, x1, y1],
            mode: BoxMode::XyxyAbs,
        }
    }

    /// Two-corner form. `x_max = x_min + width`, `y_max = y_min + height`.
    pub fn to_xyxy(self) -> Self {
        match self.mode {
            BoxMode::XyxyAbs => self,
            BoxMode::XywhAbs => {
                let [x, y, w, h] = self.coords;
                Self::xyxy(x, y, x + w, y + h)
            }
        }
    }

    /// Corner plus size form.
    pub fn to_xywh(self) -> Self {
        match self.mode {
            BoxMode::XywhAbs => self,
            BoxMode::XyxyAbs => {
                let [x0, y0, x1, y1] = self.coords;
                Self::xywh(x0, y0, x1 - x0, y1 - y0)
            }
        }
    }
}
