//! Export of the constraint system as halfspaces for `qhull H`, to inspect the feasible
//! region of the free control point.
//!
//! Output format: dimension and `1`, the interior point, then `dimension + 1` and the
//! number of halfspaces, then one line `a0 a1 a2 -b` per row of `A x <= b`. Qhull reads
//! each line as the halfspace `a . x + offset <= 0`, so the bound is written negated and
//! after the normal.

use crate::constraints::{ConstraintSystem, DIM_POINT};
use nalgebra::Vector3;
use std::io::{self, Write};

/// Half extent of the slab added around the interior point by `clip_z`.
const CLIP_Z_EXTENT: f64 = 1.0;

/// Writes the halfspaces. With `clip_z`, two rows bounding the third coordinate to
/// `interior.z +- 1` are appended so that the region is bounded.
pub fn write_qhull<W: Write>(
    writer: &mut W,
    system: &ConstraintSystem,
    interior: &Vector3<f64>,
    clip_z: bool,
) -> io::Result<()> {
    let extra = if clip_z { 2 } else { 0 };
    writeln!(writer, "{} 1", DIM_POINT)?;
    writeln!(writer, "{} {} {}", interior.x, interior.y, interior.z)?;
    writeln!(writer, "{}", DIM_POINT + 1)?;
    writeln!(writer, "{}", system.rows() + extra)?;

    for i in 0..system.rows() {
        let row = system.a.row(i);
        writeln!(writer, "{} {} {} {}", row[0], row[1], row[2], -system.b[i])?;
    }

    if clip_z {
        writeln!(writer, "0 0 1 {}", -(interior.z + CLIP_Z_EXTENT))?;
        writeln!(writer, "0 0 -1 {}", interior.z - CLIP_Z_EXTENT)?;
    }
    Ok(())
}

/// Saves the halfspaces into the given file.
#[cfg(feature = "allow_filesystem")]
pub fn save_qhull_file<P: AsRef<std::path::Path>>(
    path: P,
    system: &ConstraintSystem,
    interior: &Vector3<f64>,
    clip_z: bool,
) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    write_qhull(&mut writer, system, interior, clip_z)?;
    writer.flush()
}
