mod common;

use approx::assert_relative_eq;
use syzygy::config::SystemConfig;

const TRANSIT: &str = r#"
rv = true

[primary]
r = 1.0
m = 1.0

[[secondaries]]
r = 0.1
m = 0.001
porb = 2.0
t0 = 0.0
"#;

#[test]
fn system_from_toml_file() {
    let path = std::env::temp_dir().join(format!("syzygy_config_{}.toml", std::process::id()));
    std::fs::write(&path, TRANSIT).unwrap();
    let config = SystemConfig::from_file(&path);
    std::fs::remove_file(&path).unwrap();

    let system = config.unwrap().build().unwrap();
    let t = common::linspace(-0.5, 0.5, 11);
    let flux = system.flux(&t).unwrap();

    // Mid-transit at t = 5: 1% of the star hidden, the planet adds its own unit disk
    assert_relative_eq!(flux[(5, 0)], 1.99, max_relative = 1e-9);
    assert_relative_eq!(flux[(0, 0)], 2.0, max_relative = 1e-12);

    let rv = system.rv(&t).unwrap();
    assert!(rv[0] > 0.0);
    assert!(rv[10] < 0.0);
}

#[test]
fn period_from_semi_major_axis() {
    let with_period = SystemConfig::from_toml_str(TRANSIT).unwrap();
    let a = syzygy::orbit::semi_major_axis_from_period(2.0, 1.001);
    let with_axis = SystemConfig::from_toml_str(&TRANSIT.replace(
        "porb = 2.0",
        &format!("porb = 0.0\na = {a:?}"),
    ))
    .unwrap();

    let t = common::linspace(-0.1, 0.1, 9);
    let x = with_period.build().unwrap().design_matrix(&t).unwrap();
    let y = with_axis.build().unwrap().design_matrix(&t).unwrap();
    for (a, b) in x.iter().zip(y.iter()) {
        assert_relative_eq!(a, b, max_relative = 1e-9);
    }
}
