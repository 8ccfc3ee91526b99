//! Fielding geometry
//!
//! Derives, for the outfielder who caught the ball, the catch point's distance to every base
//! and the distance each outfielder covered between the ball crossing the zone and the ball
//! being fielded. Coordinates are in feet on the Statcast field grid.

use crate::error::Result;
use crate::frame::require;
use crate::pivot::{widened_column, Role};
use polars::prelude::*;

/// Column holding the position (7/8/9 or LF/CF/RF) of the fielder who made the catch.
pub const FIELDER_POSITION: &str = "fielder_position";

/// Suffix of the catching fielder's coordinate columns.
pub const FIELDER_SUFFIX: &str = "fielder";

const ZONE_X: &str = "at_zone_x";
const ZONE_Y: &str = "at_zone_y";
const FIELDED_X: &str = "at_fielded_x";
const FIELDED_Y: &str = "at_fielded_y";

/// Offset of first and third base from home plate along each axis (90 ft / sqrt 2).
pub const BASE_OFFSET: f64 = 63.64;
/// Distance from home plate to second base along the y axis.
pub const SECOND_BASE_DEPTH: f64 = 127.28;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Home,
    First,
    Second,
    Third,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::Home, Base::First, Base::Second, Base::Third];

    pub fn name(self) -> &'static str {
        match self {
            Base::Home => "home",
            Base::First => "first",
            Base::Second => "second",
            Base::Third => "third",
        }
    }
}

/// Base positions relative to a home-plate origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diamond {
    pub home: Point,
}

impl Default for Diamond {
    fn default() -> Self {
        Self {
            home: Point::new(0.0, 0.0),
        }
    }
}

impl Diamond {
    pub fn with_home(x: f64, y: f64) -> Self {
        Self {
            home: Point::new(x, y),
        }
    }

    pub fn base(&self, base: Base) -> Point {
        let Point { x, y } = self.home;
        match base {
            Base::Home => self.home,
            Base::First => Point::new(x + BASE_OFFSET, y + BASE_OFFSET),
            Base::Second => Point::new(x, y + SECOND_BASE_DEPTH),
            Base::Third => Point::new(x - BASE_OFFSET, y + BASE_OFFSET),
        }
    }
}

/// Interpret a `fielder_position` label (`CF`) or code (`8`) as an outfield role.
pub fn catching_role(position: &str) -> Option<Role> {
    let position = position.trim();
    Role::from_label(position)
        .filter(|role| Role::OUTFIELD.contains(role))
        .or_else(|| position.parse().ok().and_then(catching_role_code))
}

/// Outfield role of a numeric `fielder_position`.
pub fn catching_role_code(code: i64) -> Option<Role> {
    Role::from_code(code).filter(|role| Role::OUTFIELD.contains(role))
}

fn catching_roles(positions: &Series) -> Result<Vec<Option<Role>>> {
    Ok(match positions.dtype() {
        DataType::String => positions
            .str()?
            .into_iter()
            .map(|p| p.and_then(catching_role))
            .collect(),
        _ => positions
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|c| c.and_then(catching_role_code))
            .collect(),
    })
}

pub fn distance_to_base_column(base: Base) -> String {
    format!("distance_catch_to_{}", base.name())
}

pub fn distance_traveled_column(who: &str) -> String {
    format!("distance_traveled_{}", who)
}

pub const DISTANCE_TRAVELED_ALL: &str = "distance_traveled_all_fielders";

// Non-finite values count as missing.
fn coordinate(plays: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    require(plays, &[column])?;
    let values = plays.column(column)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

// One position's zone and fielded coordinates.
struct Coordinates {
    zone_x: Vec<Option<f64>>,
    zone_y: Vec<Option<f64>>,
    fielded_x: Vec<Option<f64>>,
    fielded_y: Vec<Option<f64>>,
}

impl Coordinates {
    fn read(plays: &DataFrame, role: Role) -> Result<Self> {
        let read = |c: &str| coordinate(plays, &widened_column(c, role));
        Ok(Self {
            zone_x: read(ZONE_X)?,
            zone_y: read(ZONE_Y)?,
            fielded_x: read(FIELDED_X)?,
            fielded_y: read(FIELDED_Y)?,
        })
    }

    fn zone(&self, row: usize) -> Option<Point> {
        Some(Point::new(self.zone_x[row]?, self.zone_y[row]?))
    }

    fn fielded(&self, row: usize) -> Option<Point> {
        Some(Point::new(self.fielded_x[row]?, self.fielded_y[row]?))
    }

    fn traveled(&self, row: usize) -> Option<f64> {
        Some(self.zone(row)?.distance(self.fielded(row)?))
    }
}

/// Add the catching fielder's coordinates and the distance columns.
///
/// New columns: `at_zone_{x,y}_fielder`, `at_fielded_{x,y}_fielder`,
/// `distance_catch_to_{home,first,second,third}`, `distance_traveled_{fielder,LF,CF,RF}` and
/// `distance_traveled_all_fielders`. Any distance with a null input is null.
pub fn derive_geometry(plays: &DataFrame, diamond: &Diamond) -> Result<DataFrame> {
    require(plays, &[FIELDER_POSITION])?;
    let catchers = catching_roles(plays.column(FIELDER_POSITION)?)?;
    let outfield: Vec<(Role, Coordinates)> = Role::OUTFIELD
        .into_iter()
        .map(|role| Ok((role, Coordinates::read(plays, role)?)))
        .collect::<Result<_>>()?;

    let n = plays.height();
    let mut fielder_coords: [Vec<Option<f64>>; 4] = Default::default();
    let mut to_base: [Vec<Option<f64>>; 4] = Default::default();
    let mut traveled_fielder = Vec::with_capacity(n);
    let mut traveled_by_role: [Vec<Option<f64>>; 3] = Default::default();
    let mut traveled_all = Vec::with_capacity(n);

    for (row, catcher) in catchers.into_iter().enumerate() {
        let catcher = catcher
            .and_then(|role| outfield.iter().find(|(r, _)| *r == role))
            .map(|(_, coords)| coords);

        let [zx, zy, fx, fy] = &mut fielder_coords;
        zx.push(catcher.and_then(|c| c.zone_x[row]));
        zy.push(catcher.and_then(|c| c.zone_y[row]));
        fx.push(catcher.and_then(|c| c.fielded_x[row]));
        fy.push(catcher.and_then(|c| c.fielded_y[row]));

        let catch_point = catcher.and_then(|c| c.fielded(row));
        for (column, base) in to_base.iter_mut().zip(Base::ALL) {
            column.push(catch_point.map(|p| p.distance(diamond.base(base))));
        }

        traveled_fielder.push(catcher.and_then(|c| c.traveled(row)));

        let mut total = Some(0.0);
        for (column, (_, coords)) in traveled_by_role.iter_mut().zip(&outfield) {
            let d = coords.traveled(row);
            total = total.zip(d).map(|(t, d)| t + d);
            column.push(d);
        }
        traveled_all.push(total);
    }

    let mut columns = Vec::new();
    for (coord, values) in [ZONE_X, ZONE_Y, FIELDED_X, FIELDED_Y]
        .into_iter()
        .zip(fielder_coords)
    {
        columns.push(Series::new(&format!("{}_{}", coord, FIELDER_SUFFIX), values));
    }
    for (base, values) in Base::ALL.into_iter().zip(to_base) {
        columns.push(Series::new(&distance_to_base_column(base), values));
    }
    columns.push(Series::new(
        &distance_traveled_column(FIELDER_SUFFIX),
        traveled_fielder,
    ));
    for (role, values) in Role::OUTFIELD.into_iter().zip(traveled_by_role) {
        columns.push(Series::new(&distance_traveled_column(role.label()), values));
    }
    columns.push(Series::new(DISTANCE_TRAVELED_ALL, traveled_all));

    let mut out = plays.clone();
    for column in columns {
        out.with_column(column)?;
    }
    log::info!("Derived fielding geometry for {} plays", n);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(positions: Series, rows: &[[Option<f64>; 12]]) -> DataFrame {
        let mut columns = vec![positions.with_name(FIELDER_POSITION)];
        let mut k = 0;
        for role in Role::OUTFIELD {
            for c in [ZONE_X, ZONE_Y, FIELDED_X, FIELDED_Y] {
                let values: Vec<Option<f64>> = rows.iter().map(|r| r[k]).collect();
                columns.push(Series::new(&widened_column(c, role), values));
                k += 1;
            }
        }
        DataFrame::new(columns).unwrap()
    }

    fn f(frame: &DataFrame, row: usize, column: &str) -> Option<f64> {
        frame.column(column).unwrap().f64().unwrap().get(row)
    }

    #[test]
    fn test_center_fielder_catch() {
        let cf = [Some(0.0), Some(300.0), Some(10.0), Some(310.0)];
        let mut coords = [None; 12];
        coords[4..8].copy_from_slice(&cf);
        let plays = wide(Series::new("", [8i64]), &[coords]);
        let frame = derive_geometry(&plays, &Diamond::default()).unwrap();

        let traveled_cf = f(&frame, 0, "distance_traveled_CF").unwrap();
        assert!((traveled_cf - 200f64.sqrt()).abs() < 1e-9);
        assert!((traveled_cf - 14.14).abs() < 0.01);
        assert_eq!(f(&frame, 0, "distance_traveled_fielder"), Some(traveled_cf));

        let home = f(&frame, 0, "distance_catch_to_home").unwrap();
        assert!((home - 310.16).abs() < 0.01);
        assert_eq!(f(&frame, 0, "at_fielded_y_fielder"), Some(310.0));

        // the corner outfielders have no coordinates
        assert_eq!(f(&frame, 0, "distance_traveled_LF"), None);
        assert_eq!(f(&frame, 0, DISTANCE_TRAVELED_ALL), None);
    }

    #[test]
    fn test_base_distances_and_total() {
        #[rustfmt::skip]
        let coords = [
            Some(0.0), Some(0.0), Some(3.0), Some(4.0), // LF travels 5
            Some(0.0), Some(0.0), Some(0.0), Some(0.0), // CF stays put
            Some(1.0), Some(1.0), Some(1.0), Some(2.0), // RF travels 1
        ];
        let diamond = Diamond::with_home(0.0, -10.0);
        let frame = derive_geometry(&wide(Series::new("", ["LF"]), &[coords]), &diamond).unwrap();

        assert_eq!(f(&frame, 0, "distance_traveled_fielder"), Some(5.0));
        assert_eq!(f(&frame, 0, "distance_traveled_CF"), Some(0.0));
        assert_eq!(f(&frame, 0, DISTANCE_TRAVELED_ALL), Some(6.0));

        let catch = Point::new(3.0, 4.0);
        for base in Base::ALL {
            let d = f(&frame, 0, &distance_to_base_column(base)).unwrap();
            assert!((d - catch.distance(diamond.base(base))).abs() < 1e-9);
            assert!(d >= 0.0);
        }
        assert!((f(&frame, 0, "distance_catch_to_second").unwrap()
            - Point::new(3.0, 4.0).distance(Point::new(0.0, 117.28)))
        .abs()
            < 1e-9);
    }

    #[test]
    fn test_unknown_catcher_and_null_coordinates() {
        let mut coords = [Some(1.0); 12];
        coords[2] = None;
        let mut infinite = [Some(1.0); 12];
        infinite[10] = Some(f64::INFINITY);
        let positions = Series::new("", [None, Some(7i64), Some(9)]);
        let frame =
            derive_geometry(&wide(positions, &[coords, coords, infinite]), &Diamond::default())
                .unwrap();

        for column in ["distance_catch_to_home", "distance_traveled_fielder", "at_zone_x_fielder"] {
            assert_eq!(f(&frame, 0, column), None);
        }
        // LF made the catch but has no fielded x
        assert_eq!(f(&frame, 1, "distance_catch_to_first"), None);
        assert_eq!(f(&frame, 1, "distance_traveled_LF"), None);
        assert_eq!(f(&frame, 1, "distance_traveled_RF"), Some(0.0));
        assert_eq!(f(&frame, 1, DISTANCE_TRAVELED_ALL), None);
        // an infinite fielded x is treated as missing
        assert_eq!(f(&frame, 2, "distance_traveled_RF"), None);
        assert_eq!(f(&frame, 2, "at_fielded_x_fielder"), None);
    }

    #[test]
    fn test_distance_is_zero_only_for_same_point() {
        let a = Point::new(1.5, -2.0);
        assert_eq!(a.distance(a), 0.0);
        assert!(a.distance(Point::new(1.5, -2.000001)) > 0.0);
        assert_eq!(Point::new(0.0, 0.0).distance(Point::new(-3.0, -4.0)), 5.0);
    }

    #[test]
    fn test_catching_role_parsing() {
        assert_eq!(catching_role_code(9), Some(Role::RightField));
        assert_eq!(catching_role("CF"), Some(Role::CenterField));
        assert_eq!(catching_role(" 7 "), Some(Role::LeftField));
        assert_eq!(catching_role_code(37), None);
        assert_eq!(catching_role("R3"), None);
        assert_eq!(catching_role(""), None);
    }
}
