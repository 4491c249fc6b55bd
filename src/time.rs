use hifitime::{Epoch, TimeScale, Unit};

use crate::constants::MJD_OFFSET;

/// Modified julian dates (MJD) of a series of epochs, in the TDB time scale
///
/// Argument
/// --------
/// * `epochs`: the observation epochs
///
/// Return
/// ------
/// * a vector of MJD (TDB days), usable as evaluation times of a system
pub fn times_from_epochs(epochs: &[Epoch]) -> Vec<f64> {
    epochs
        .iter()
        .map(|e| e.to_jde_tdb_days() - MJD_OFFSET)
        .collect()
}

/// Transformation from modified julian dates (TDB days) to epochs
///
/// Argument
/// --------
/// * `mjd`: a vector of MJD in the TDB time scale
///
/// Return
/// ------
/// * a vector of epochs
pub fn epochs_from_times(mjd: &[f64]) -> Vec<Epoch> {
    mjd.iter()
        .map(|&t| Epoch::from_mjd_in_time_scale(t, TimeScale::TDB))
        .collect()
}

/// Days elapsed since a reference epoch, e.g. a time of transit
///
/// Argument
/// --------
/// * `epochs`: the observation epochs
/// * `reference`: the epoch mapped to `t = 0`
///
/// Return
/// ------
/// * a vector of signed durations in days
pub fn days_since(epochs: &[Epoch], reference: Epoch) -> Vec<f64> {
    epochs
        .iter()
        .map(|&e| (e - reference).to_unit(Unit::Day))
        .collect()
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_times_from_epochs() {
        let epochs = [
            Epoch::from_mjd_in_time_scale(60000.0, TimeScale::TDB),
            Epoch::from_mjd_in_time_scale(60000.25, TimeScale::TDB),
        ];
        let t = times_from_epochs(&epochs);
        assert_abs_diff_eq!(t[0], 60000.0, epsilon = 1e-8);
        assert_abs_diff_eq!(t[1], 60000.25, epsilon = 1e-8);

        let back = epochs_from_times(&t);
        assert_abs_diff_eq!(times_from_epochs(&back)[1], 60000.25, epsilon = 1e-8);
    }

    #[test]
    fn test_days_since_reference() {
        let reference = Epoch::from_mjd_in_time_scale(59000.5, TimeScale::TDB);
        let epochs = epochs_from_times(&[59000.0, 59000.5, 59003.5]);
        let t = days_since(&epochs, reference);
        assert_abs_diff_eq!(t[0], -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(t[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t[2], 3.0, epsilon = 1e-9);
    }
}
