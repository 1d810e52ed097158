/*
    Gear Ratio Resolver
*/

use crate::resources::MotorError;

/* --------------------------- Gear Train Input -------------------------- */
/// One element of a user supplied gear train.
///
/// `[Teeth(12), Teeth(20), Teeth(36)]` describes a single train, while
/// `[Train(&[12, 20, 36]), Train(&[20, 40])]` describes meshed stages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GearItem<'a> {
    Teeth(i32),
    Train(&'a [i32]),
}

/* --------------------------- Code -------------------------- */
/// Resolves a gear train into the scale between motor shaft and output shaft.
///
/// If the first and last elements are plain tooth counts, the whole input is
/// one train. Otherwise every element must be a train of its own. Each train
/// contributes `last / first`.
pub fn resolve_gear_ratio(gears: &[GearItem]) -> Result<f32, MotorError> {
    let (first, last) = match (gears.first(), gears.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(MotorError::InvalidArgument),
    };

    if let (GearItem::Teeth(first), GearItem::Teeth(last)) = (first, last) {
        return stage_ratio(*first, *last);
    }

    let mut ratio = 1.0;
    for item in gears {
        match item {
            GearItem::Train(teeth) => {
                let (first, last) = match (teeth.first(), teeth.last()) {
                    (Some(first), Some(last)) => (*first, *last),
                    _ => return Err(MotorError::InvalidArgument),
                };
                ratio *= stage_ratio(first, last)?;
            },
            GearItem::Teeth(_) => return Err(MotorError::InvalidArgument),
        }
    }

    Ok(ratio)
}

fn stage_ratio(first: i32, last: i32) -> Result<f32, MotorError> {
    if first < 1 || last < 1 {
        return Err(MotorError::InvalidArgument);
    }
    Ok(last as f32 / first as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use GearItem::{Teeth, Train};

    #[test]
    fn test_single_train() {
        let ratio = resolve_gear_ratio(&[Teeth(12), Teeth(20), Teeth(36)]).unwrap();
        assert_eq!(ratio, 3.0);
    }

    #[test]
    fn test_multiple_stages() {
        let ratio = resolve_gear_ratio(&[Train(&[12, 20, 36]), Train(&[20, 40])]).unwrap();
        assert_eq!(ratio, 6.0);
    }

    #[test]
    fn test_reduction_below_one() {
        let ratio = resolve_gear_ratio(&[Teeth(40), Teeth(8)]).unwrap();
        assert_eq!(ratio, 0.2);
    }

    #[test]
    fn test_zero_teeth_rejected() {
        assert_eq!(
            resolve_gear_ratio(&[Teeth(0), Teeth(20), Teeth(36)]),
            Err(MotorError::InvalidArgument)
        );
        assert_eq!(
            resolve_gear_ratio(&[Train(&[12, 36]), Train(&[20, -1])]),
            Err(MotorError::InvalidArgument)
        );
    }

    #[test]
    fn test_middle_gears_do_not_matter() {
        // Idler gears only change direction, not the ratio
        let ratio = resolve_gear_ratio(&[Teeth(8), Teeth(0), Teeth(24)]).unwrap();
        assert_eq!(ratio, 3.0);
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert_eq!(resolve_gear_ratio(&[]), Err(MotorError::InvalidArgument));
        assert_eq!(resolve_gear_ratio(&[Train(&[])]), Err(MotorError::InvalidArgument));
        assert_eq!(
            resolve_gear_ratio(&[Train(&[12, 36]), Teeth(5), Train(&[20, 40])]),
            Err(MotorError::InvalidArgument)
        );
    }

    #[test]
    fn test_large_trains_do_not_overflow() {
        let ratio = resolve_gear_ratio(&[
            Train(&[1, 30_000]),
            Train(&[1, 30_000]),
            Train(&[30_000, 1]),
        ]).unwrap();
        assert!((ratio - 30_000.0).abs() < 1.0);
    }
}
