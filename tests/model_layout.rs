//! Network input layouts and pass routing.

mod common;

use common::RampModel;
use cv_crestereo::model::{CreStereo, InputLayout};
use cv_crestereo::prelude::*;
use ndarray::Array4;

fn names(n: &[&str]) -> Vec<String> {
    n.iter().map(|s| s.to_string()).collect()
}

#[test]
fn refine_inputs_are_matched_by_name() -> Result<()> {
    let layout = InputLayout::from_input_names(&names(&["flow_init", "right", "left"]))?;

    assert_eq!(layout, InputLayout::Refine {
        left: "left".into(),
        right: "right".into(),
        flow_init: "flow_init".into()
    });
    assert!(layout.takes_flow_init());

    Ok(())
}

#[test]
fn unnamed_inputs_fall_back_to_order() -> Result<()> {
    let layout = InputLayout::from_input_names(&names(&["input.1", "input.2", "flow"]))?;
    assert_eq!(layout, InputLayout::Refine {
        left: "input.1".into(),
        right: "input.2".into(),
        flow_init: "flow".into()
    });

    let layout = InputLayout::from_input_names(&names(&["a", "b"]))?;
    assert_eq!(layout, InputLayout::Initial {
        left: "a".into(),
        right: "b".into()
    });
    assert!(!layout.takes_flow_init());

    Ok(())
}

#[test]
fn wrong_input_count_is_rejected() {
    assert!(matches!(
        InputLayout::from_input_names(&names(&["left"])),
        Err(Error::Model(_))
    ));
    assert!(matches!(
        InputLayout::from_input_names(&names(&["a", "b", "c", "d"])),
        Err(Error::Model(_))
    ));
}

#[test]
fn passes_route_to_their_networks() -> Result<()> {
    let mut model = CreStereo::new(RampModel::default(), Some(RampModel::default()));
    let img = Array4::zeros((1, 3, 16, 32));
    let seed = Array4::zeros((1, 2, 8, 16));

    model.forward(&img, &img, None)?;
    model.forward(&img, &img, Some(&seed))?;

    assert_eq!(model.initial_mut().calls.len(), 1);
    assert_eq!(model.initial_mut().calls[0].1, None);
    assert_eq!(model.refine_mut().calls.len(), 1);
    assert_eq!(model.refine_mut().calls[0].1, Some((1, 2, 8, 16)));

    Ok(())
}

#[test]
fn single_network_serves_both_passes() -> Result<()> {
    let mut model = CreStereo::new(RampModel::default(), None);
    let img = Array4::zeros((1, 3, 16, 32));

    model.forward(&img, &img, None)?;
    assert_eq!(model.refine_mut().calls.len(), 1);

    Ok(())
}
