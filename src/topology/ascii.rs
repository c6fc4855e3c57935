//! Human-readable rendering of land-mass and boundary maps.
//!
//! Produces the classic fixed-width survey of the horizontal grid: rows
//! printed top to bottom, a column index ruler every five cells, island
//! labels printed modulo 10 and perimeter cells (`-1`) as `*`. Wide grids
//! are broken into 125-column sweeps. Diagnostic only; the driver logs it at
//! info level and the golden-output tests pin it down.

use crate::grid::Field2;

const LINE_WIDTH: usize = 125;

/// Render an integer map (label map or per-island boundary map).
pub fn ascii_map(map: &Field2<i32>) -> String {
    let imt = map.ni();
    let njt = map.nj();
    let mut out = String::new();
    let mut iremain = imt;
    let mut istart = 0usize;

    out.push('\n');
    let indent = (5 + LINE_WIDTH.min(imt) / 2).saturating_sub(13);
    out.push_str(&" ".repeat(indent));
    out.push_str("Land mass and perimeter");
    out.push('\n');

    while iremain > 0 {
        let iline = iremain.min(LINE_WIDTH);
        iremain -= iline;
        out.push('\n');
        out.push_str(&column_ruler(istart, iline));
        out.push('\n');
        for j in (0..njt).rev() {
            out.push_str(&format!("{:3} ", j));
            for i in istart..istart + iline {
                out.push(cell_char(map[(i, j)]));
            }
            out.push('\n');
        }
        out.push_str(&column_ruler(istart, iline));
        out.push('\n');
        istart += iline;
    }
    out.push('\n');
    out
}

/// Column indices every five cells, right-aligned in 5-character slots.
fn column_ruler(istart: usize, iline: usize) -> String {
    let mut ruler = String::new();
    let mut i = 0;
    while i < iline {
        ruler.push_str(&format!("{:5}", istart + i));
        i += 5;
    }
    ruler
}

fn cell_char(value: i32) -> char {
    if value > 0 {
        char::from_digit((value % 10) as u32, 10).unwrap_or('?')
    } else if value == 0 {
        '0'
    } else {
        '*'
    }
}
