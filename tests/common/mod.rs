//! Shared geometry fixtures, written to disk as `.dat` files.
//!
//! The unit sphere is tiled by six rational Bezier panels of degree
//! four. The base panel parametrizes the face of the inscribed cube
//! with outward normal along positive y; the other five patches are
//! proper rotations of it, so the control nets of shared edges agree
//! exactly and the mesh is watertight at every refinement level.

use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, Vector3};

use isobem::geometry::dat::{read_raw_patches, write_dat, RawPatch};

const SPHERE_PANEL: &str = "\
# nurbs mesh v.2.1
# sphere panel fixture
# +y face of the unit sphere
#
2 3 1 0 0
PATCH 0
4 4
5 5
0.000000000000000 0.000000000000000 0.000000000000000 0.000000000000000 0.000000000000000 \
1.000000000000000 1.000000000000000 1.000000000000000 1.000000000000000 1.000000000000000
0.000000000000000 0.000000000000000 0.000000000000000 0.000000000000000 0.000000000000000 \
1.000000000000000 1.000000000000000 1.000000000000000 1.000000000000000 1.000000000000000
0.577350269189626 0.278838767912603 0.000000000000000 -0.278838767912603 -0.577350269189626 \
0.632392158505876 0.315090742770461 0.000000000000000 -0.315090742770461 -0.632392158505876 \
0.647791890991355 0.328648516366383 0.000000000000000 -0.328648516366383 -0.647791890991355 \
0.632392158505876 0.315090742770461 0.000000000000000 -0.315090742770461 -0.632392158505876 \
0.577350269189626 0.278838767912603 0.000000000000000 -0.278838767912603 -0.577350269189626
0.577350269189626 0.632392158505876 0.647791890991355 0.632392158505876 0.577350269189626 \
0.632392158505876 0.762259526419164 0.804938188574224 0.762259526419164 0.632392158505876 \
0.647791890991355 0.804938188574224 0.859116756396542 0.804938188574224 0.647791890991355 \
0.632392158505876 0.762259526419164 0.804938188574224 0.762259526419164 0.632392158505876 \
0.577350269189626 0.632392158505876 0.647791890991355 0.632392158505876 0.577350269189626
-0.577350269189626 -0.632392158505876 -0.647791890991355 -0.632392158505876 -0.577350269189626 \
-0.278838767912603 -0.315090742770461 -0.328648516366383 -0.315090742770461 -0.278838767912603 \
-0.000000000000000 -0.000000000000000 -0.000000000000000 -0.000000000000000 -0.000000000000000 \
0.278838767912603 0.315090742770461 0.328648516366383 0.315090742770461 0.278838767912603 \
0.577350269189626 0.632392158505876 0.647791890991355 0.632392158505876 0.577350269189626
1.000000000000000 0.891211203608397 0.859116756396542 0.891211203608397 1.000000000000000 \
0.891211203608397 0.762259526419164 0.718665173540050 0.762259526419164 0.891211203608397 \
0.859116756396542 0.718665173540050 0.671272431591931 0.718665173540050 0.859116756396542 \
0.891211203608397 0.762259526419164 0.718665173540050 0.762259526419164 0.891211203608397 \
1.000000000000000 0.891211203608397 0.859116756396542 0.891211203608397 1.000000000000000
";

/// Writes the single +y panel and returns its path.
pub fn sphere_panel(dir: &Path) -> PathBuf {
    let path = dir.join("sphere_panel.dat");
    std::fs::write(&path, SPHERE_PANEL).unwrap();
    path
}

/// Writes the six-patch unit sphere and returns its path.
pub fn sphere(dir: &Path) -> PathBuf {
    let panel = read_raw_patches(&sphere_panel(dir)).unwrap();
    // proper rotations carrying the +y panel onto the other five faces
    let faces = [
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
        [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]],
        [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]],
    ];
    let patches: Vec<RawPatch> = faces.iter().map(|face| rotate(&panel[0], face)).collect();
    let path = dir.join("sphere.dat");
    write_dat(&path, &patches).unwrap();
    path
}

fn rotate(panel: &RawPatch, rotation: &[[f64; 3]; 3]) -> RawPatch {
    let component = |row: &[f64; 3]| {
        let mut out = DMatrix::zeros(panel.xyzw[0].nrows(), panel.xyzw[0].ncols());
        for (axis, factor) in row.iter().enumerate() {
            if *factor != 0.0 {
                out += &panel.xyzw[axis] * *factor;
            }
        }
        out
    };
    RawPatch {
        xyzw: [
            component(&rotation[0]),
            component(&rotation[1]),
            component(&rotation[2]),
            panel.xyzw[3].clone(),
        ],
        knots_x: panel.knots_x.clone(),
        knots_y: panel.knots_y.clone(),
    }
}

/// A harmonic polynomial, the Dirichlet datum of the solver tests.
pub fn harmonic(point: &Vector3<f64>) -> f64 {
    4.0 * point.x * point.x - 3.0 * point.y * point.y - point.z * point.z
}
