use std::{
    io::{Read, Write},
    path::Path,
};

use markerpose_3d::{AggregateError, TwistTilt};
use markerpose_aruco::Detection;
use serde::{Deserialize, Serialize};

use crate::error::IoError;

/// The header of a pose table.
pub const POSE_HEADER: [&str; 7] = ["id", "tx", "ty", "tz", "rx", "ry", "rz"];

/// The default rotation vector columns.
pub const ROTATION_COLUMNS: [&str; 3] = ["rx", "ry", "rz"];

/// The column holding the twist angle in a twist table.
pub const TWIST_COLUMN: &str = "rotation_z";

/// The column holding the tilt angle in a twist table.
pub const TILT_COLUMN: &str = "rotation_to_normal";

/// One row of a pose table: a marker id with its translation and rotation vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseRow {
    /// The marker id.
    pub id: u32,
    /// Translation along x.
    pub tx: f64,
    /// Translation along y.
    pub ty: f64,
    /// Translation along z.
    pub tz: f64,
    /// Rotation vector, x component.
    pub rx: f64,
    /// Rotation vector, y component.
    pub ry: f64,
    /// Rotation vector, z component.
    pub rz: f64,
}

impl PoseRow {
    /// The rotation vector of the row.
    pub fn rvec(&self) -> [f64; 3] {
        [self.rx, self.ry, self.rz]
    }

    /// The translation vector of the row.
    pub fn tvec(&self) -> [f64; 3] {
        [self.tx, self.ty, self.tz]
    }
}

impl From<&Detection> for PoseRow {
    fn from(detection: &Detection) -> Self {
        Self {
            id: detection.id,
            tx: detection.tvec[0],
            ty: detection.tvec[1],
            tz: detection.tvec[2],
            rx: detection.rvec[0],
            ry: detection.rvec[1],
            rz: detection.rvec[2],
        }
    }
}

/// Write pose rows as CSV with a header line.
///
/// The header is written even when there are no rows.
pub fn write_pose_rows<W: Write>(writer: W, rows: &[PoseRow]) -> Result<(), IoError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(POSE_HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write pose rows to a CSV file.
pub fn write_pose_table(file_path: impl AsRef<Path>, rows: &[PoseRow]) -> Result<(), IoError> {
    let file = std::fs::File::create(file_path)?;
    write_pose_rows(file, rows)
}

/// A CSV table with a header, kept as text.
///
/// Columns are looked up by name so that tables with extra columns, such as
/// a leading index column, can be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl Table {
    /// Read a table from CSV data with a header line.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, IoError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let records = rdr
            .records()
            .map(|r| r.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self { headers, records })
    }

    /// Read a table from a CSV file.
    pub fn read(file_path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file_path = file_path.as_ref();
        if !file_path.exists() {
            return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
        }
        Self::from_reader(std::fs::File::open(file_path)?)
    }

    /// The column names.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The data rows.
    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    /// The number of data rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The index of a column.
    pub fn column_index(&self, name: &str) -> Result<usize, IoError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IoError::MissingColumn(name.to_string()))
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.records[row].get(column).map_or("", String::as_str)
    }

    fn number(&self, row: usize, column: usize) -> Result<f64, IoError> {
        let value = self.cell(row, column);
        value.parse::<f64>().map_err(|_| IoError::InvalidValue {
            row,
            column: self.headers[column].clone(),
            value: value.to_string(),
        })
    }

    /// The values of a numeric column.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, IoError> {
        let column = self.column_index(name)?;
        (0..self.len()).map(|row| self.number(row, column)).collect()
    }

    /// Read three numeric columns as vectors, e.g. the rotation vectors of a pose table.
    pub fn vectors(&self, columns: [&str; 3]) -> Result<Vec<[f64; 3]>, IoError> {
        let indices = [
            self.column_index(columns[0])?,
            self.column_index(columns[1])?,
            self.column_index(columns[2])?,
        ];
        (0..self.len())
            .map(|row| {
                Ok([
                    self.number(row, indices[0])?,
                    self.number(row, indices[1])?,
                    self.number(row, indices[2])?,
                ])
            })
            .collect()
    }

    /// Read the rows of a pose table.
    pub fn pose_rows(&self) -> Result<Vec<PoseRow>, IoError> {
        let id = self.column_index("id")?;
        let translations = self.vectors(["tx", "ty", "tz"])?;
        let rotations = self.vectors(ROTATION_COLUMNS)?;

        translations
            .iter()
            .zip(rotations.iter())
            .enumerate()
            .map(|(row, (t, r))| {
                let value = self.number(row, id)?;
                if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
                    return Err(IoError::InvalidValue {
                        row,
                        column: "id".to_string(),
                        value: self.cell(row, id).to_string(),
                    });
                }
                Ok(PoseRow {
                    id: value as u32,
                    tx: t[0],
                    ty: t[1],
                    tz: t[2],
                    rx: r[0],
                    ry: r[1],
                    rz: r[2],
                })
            })
            .collect()
    }
}

/// Write a table extended with the twist and tilt angle of each row.
///
/// The angles are written in radians. Rows whose decomposition failed keep
/// empty angle cells.
///
/// # Arguments
///
/// * `writer` - The CSV destination.
/// * `table` - The input table.
/// * `angles` - One decomposition result per table row.
pub fn write_twist_rows<W: Write>(
    writer: W,
    table: &Table,
    angles: &[Result<TwistTilt, AggregateError>],
) -> Result<(), IoError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let mut header = table.headers.clone();
    header.push(TWIST_COLUMN.to_string());
    header.push(TILT_COLUMN.to_string());
    wtr.write_record(&header)?;

    for (row, (record, angle)) in table.records.iter().zip(angles.iter()).enumerate() {
        let (twist, tilt) = match angle {
            Ok(tt) => (tt.twist.to_string(), tt.tilt.to_string()),
            Err(err) => {
                log::warn!("row {row}: {err}");
                (String::new(), String::new())
            }
        };
        let mut out = record.clone();
        out.push(twist);
        out.push(tilt);
        wtr.write_record(&out)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rows() -> Vec<PoseRow> {
        vec![
            PoseRow {
                id: 3,
                tx: 0.1,
                ty: -0.2,
                tz: 1.5,
                rx: 3.1,
                ry: 0.0,
                rz: 0.05,
            },
            PoseRow {
                id: 7,
                tx: 0.0,
                ty: 0.0,
                tz: 2.0,
                rx: 0.0,
                ry: 0.0,
                rz: 0.0,
            },
        ]
    }

    #[test]
    fn write_then_read_poses() -> Result<(), IoError> {
        let mut buf = Vec::new();
        write_pose_rows(&mut buf, &rows())?;

        let text = String::from_utf8_lossy(&buf);
        assert!(text.starts_with("id,tx,ty,tz,rx,ry,rz\n"));

        let table = Table::from_reader(buf.as_slice())?;
        assert_eq!(table.len(), 2);
        assert_eq!(table.pose_rows()?, rows());
        Ok(())
    }

    #[test]
    fn empty_table_has_header() -> Result<(), IoError> {
        let mut buf = Vec::new();
        write_pose_rows(&mut buf, &[])?;
        assert_eq!(String::from_utf8_lossy(&buf), "id,tx,ty,tz,rx,ry,rz\n");
        Ok(())
    }

    #[test]
    fn reads_by_column_name() -> Result<(), IoError> {
        // index column first and shuffled columns
        let data = ",rz,id,tx,ty,tz,rx,ry\n0,0.5,4,1,2,3,0.1,0.2\n1,0.0,5.0,0,0,1,0,0\n";
        let table = Table::from_reader(data.as_bytes())?;

        let poses = table.pose_rows()?;
        assert_eq!(poses[0].id, 4);
        assert_eq!(poses[0].tvec(), [1.0, 2.0, 3.0]);
        assert_eq!(poses[0].rvec(), [0.1, 0.2, 0.5]);
        assert_eq!(poses[1].id, 5);

        let custom = table.vectors(["tx", "ty", "tz"])?;
        assert_eq!(custom[1], [0.0, 0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn missing_and_invalid_columns() -> Result<(), IoError> {
        let table = Table::from_reader("rx,ry\n1,x\n".as_bytes())?;
        assert!(matches!(
            table.vectors(ROTATION_COLUMNS),
            Err(IoError::MissingColumn(c)) if c == "rz"
        ));
        assert!(matches!(
            table.column_f64("ry"),
            Err(IoError::InvalidValue { row: 0, .. })
        ));
        Ok(())
    }

    #[test]
    fn twist_table_appends_angles() -> Result<(), IoError> {
        let table = Table::from_reader("id,rx,ry,rz\n1,3.14,0,0\n2,0,0,0\n".as_bytes())?;
        let angles = vec![
            Ok(TwistTilt {
                twist: 0.25,
                tilt: 0.5,
            }),
            Err(AggregateError::DegenerateAxis(std::f64::consts::PI)),
        ];

        let mut buf = Vec::new();
        write_twist_rows(&mut buf, &table, &angles)?;

        let out = Table::from_reader(buf.as_slice())?;
        assert_eq!(
            out.headers(),
            ["id", "rx", "ry", "rz", TWIST_COLUMN, TILT_COLUMN]
        );
        assert_relative_eq!(out.column_f64(TWIST_COLUMN)?[0], 0.25);
        assert_eq!(out.records()[1][4], "");
        assert_eq!(out.records()[1][5], "");
        Ok(())
    }
}
