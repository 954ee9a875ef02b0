use std::fs;
use std::path::{Path, PathBuf};

use rstest::rstest;

use defgraph_r::placement::movable_count;
use defgraph_r::{place, place_file, NetlistError, NetlistExtractor, PlaceOptions};

fn data(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Lines that differ between two texts with the same line count.
fn changed_lines<'a>(a: &'a str, b: &'a str) -> Vec<(&'a str, &'a str)> {
    assert_eq!(a.lines().count(), b.lines().count());
    a.lines().zip(b.lines()).filter(|(x, y)| x != y).collect()
}

#[test]
fn scenario_places_the_unplaced_cell() {
    let def = fs::read_to_string(data("scenario.def")).unwrap();
    let out = place(&def, &[(1200, 1400)], &PlaceOptions::default()).unwrap();
    assert_eq!(
        changed_lines(&def, &out),
        vec![(
            "- U1 INV_X1 + UNPLACED ;",
            "- U1 INV_X1 + PLACED ( 1200 1400 ) N ;"
        )]
    );
}

#[test]
fn counter_rewrite_touches_only_placement_clauses() {
    let def = fs::read_to_string(data("counter.def")).unwrap();
    let coords = [(2000, 2800), (2380, 2800), (2760, 5600), (3140, 5600)];
    let out = place(&def, &coords, &PlaceOptions::default()).unwrap();

    let changed = changed_lines(&def, &out);
    assert_eq!(changed.len(), 4);
    for (before, after) in &changed {
        let i = before.find("UNPLACED").unwrap();
        assert_eq!(before[..i], after[..i]);
        assert!(after[i..].starts_with("PLACED ( "));
        assert!(after.ends_with(") N ;"));
    }
    assert!(out.contains("      + SOURCE NETLIST + PLACED ( 3140 5600 ) N ;\n"));
}

#[test]
fn placed_cells_become_fixed_vertices() {
    let def = fs::read_to_string(data("scenario.def")).unwrap();
    let out = place(&def, &[(1200, 1400)], &PlaceOptions::default()).unwrap();
    let netlist = NetlistExtractor::default().extract(&out).unwrap();
    let u1 = &netlist.table.vertices[1];
    assert_eq!(u1.name, "U1");
    assert!(u1.is_fixed);
    assert_eq!((u1.x, u1.y), (1200, 1400));
}

#[test]
fn coordinates_follow_movable_vertex_order() {
    let def = fs::read_to_string(data("counter.def")).unwrap();
    let netlist = NetlistExtractor::default().extract(&def).unwrap();
    let movable: Vec<&str> = netlist
        .table
        .movable()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(movable.len(), movable_count(&def, &PlaceOptions::default()).unwrap());

    let coords: Vec<(i64, i64)> = (0..movable.len() as i64).map(|i| (i * 10, i)).collect();
    let out = place(&def, &coords, &PlaceOptions::default()).unwrap();
    let placed = NetlistExtractor::default().extract(&out).unwrap();
    for (i, name) in movable.iter().enumerate() {
        let id = placed.table.vertex_index(name).unwrap();
        let v = &placed.table.vertices[id];
        assert_eq!((v.x, v.y), coords[i]);
    }
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(5)]
fn wrong_count_leaves_def_untouched(#[case] rows: usize) {
    let dir = tempfile::tempdir().unwrap();
    let def = dir.path().join("counter.def");
    fs::copy(data("counter.def"), &def).unwrap();
    let original = fs::read(&def).unwrap();

    let coords = dir.path().join("coords.csv");
    let text: String = (0..rows).map(|i| format!("{},{}\n", i * 380, 2800)).collect();
    fs::write(&coords, text).unwrap();

    let err = place_file(&def, &coords, &def, &PlaceOptions::default()).unwrap_err();
    match err {
        NetlistError::CountMismatch { expected, found } => {
            assert_eq!(expected, 4);
            assert_eq!(found, rows);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(fs::read(&def).unwrap(), original);
}

#[test]
fn place_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let def = dir.path().join("scenario.def");
    fs::copy(data("scenario.def"), &def).unwrap();
    let coords = dir.path().join("coords.csv");
    fs::write(&coords, "1234.7,5678.2\n").unwrap();

    let n = place_file(&def, &coords, &def, &PlaceOptions::default()).unwrap();
    assert_eq!(n, 1);
    let text = fs::read_to_string(&def).unwrap();
    assert!(text.contains("- U1 INV_X1 + PLACED ( 1234 5678 ) N ;"));
}

#[test]
fn repeated_annotation_is_stable() {
    let def = fs::read_to_string(data("counter.def")).unwrap();
    let opts = PlaceOptions {
        replace_placed: true,
    };
    let coords = [(1, 1), (2, 2), (3, 3), (4, 4)];
    let once = place(&def, &coords, &opts).unwrap();
    let twice = place(&once, &coords, &opts).unwrap();
    assert_eq!(once, twice);
}

const MIXED: &str = "\
COMPONENTS 3 ;
- U0 INV_X1 ;
- U1 INV_X1 + UNPLACED ;
- U2 BUF_X1 + FIXED ( 0 0 ) N ;
END COMPONENTS
PINS 0 ;
END PINS
NETS 0 ;
END NETS
";

#[test]
fn clauseless_component_takes_a_coordinate() {
    let netlist = NetlistExtractor::default().extract(MIXED).unwrap();
    let opts = PlaceOptions::default();
    assert_eq!(netlist.table.movable().count(), 2);
    assert_eq!(movable_count(MIXED, &opts).unwrap(), 2);

    let out = place(MIXED, &[(1, 2), (3, 4)], &opts).unwrap();
    assert_eq!(
        changed_lines(MIXED, &out),
        vec![
            ("- U0 INV_X1 ;", "- U0 INV_X1 + PLACED ( 1 2 ) N ;"),
            ("- U1 INV_X1 + UNPLACED ;", "- U1 INV_X1 + PLACED ( 3 4 ) N ;"),
        ]
    );

    let placed = NetlistExtractor::default().extract(&out).unwrap();
    assert_eq!(placed.table.movable().count(), 0);
    let u0 = &placed.table.vertices[0];
    assert!(u0.is_fixed);
    assert_eq!((u0.x, u0.y), (1, 2));
}

#[test]
fn in_place_write_leaves_no_stray_files() {
    let dir = tempfile::tempdir().unwrap();
    let def = dir.path().join("mixed.def");
    fs::write(&def, MIXED).unwrap();
    let coords = dir.path().join("coords.csv");
    fs::write(&coords, "1,2\n3,4\n").unwrap();

    place_file(&def, &coords, &def, &PlaceOptions::default()).unwrap();
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["coords.csv", "mixed.def"]);
    assert!(fs::read_to_string(&def)
        .unwrap()
        .contains("- U0 INV_X1 + PLACED ( 1 2 ) N ;"));
}

#[test]
fn unwritable_output_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let def = dir.path().join("mixed.def");
    fs::write(&def, MIXED).unwrap();
    let coords = dir.path().join("coords.csv");
    fs::write(&coords, "1,2\n3,4\n").unwrap();
    let out = dir.path().join("missing").join("out.def");

    let err = place_file(&def, &coords, &out, &PlaceOptions::default()).unwrap_err();
    assert!(matches!(err, NetlistError::Io { .. }));
    assert!(!out.exists());
    assert_eq!(fs::read_to_string(&def).unwrap(), MIXED);
}
