//! # Stereo network
//!
//! The stereo network is treated as an opaque function from an image pair (and optionally a
//! flow seed) to a dense flow field. [`StereoModel`] is the seam between the pipeline and the
//! runtime executing the network; [`OnnxStereoModel`] runs an ONNX export through ONNX Runtime.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{Array4, Ix4};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

pub trait StereoModel {
    /// Run the network on a `[1, 3, H, W]` image pair, returning the `[1, 2, H, W]` flow.
    ///
    /// `flow_init` is a coarse flow at half the input resolution used to seed refinement.
    fn forward(
        &mut self,
        left: &Array4<f32>,
        right: &Array4<f32>,
        flow_init: Option<&Array4<f32>>
    ) -> Result<Array4<f32>>;
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// The inputs an exported network expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLayout {
    /// `left, right`: no flow seed.
    Initial {
        left: String,
        right: String
    },

    /// `left, right, flow_init`.
    Refine {
        left: String,
        right: String,
        flow_init: String
    }
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A stereo network exported to ONNX.
pub struct OnnxStereoModel {
    session: Session,
    layout: InputLayout,
    path: PathBuf
}

/// The two pass stereo model: a coarse pass without a seed followed by a seeded refinement.
///
/// If no separate initial network is provided the refinement network serves both passes.
pub struct CreStereo<M: StereoModel> {
    refine: M,
    initial: Option<M>
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Load the stereo network, along with an optional dedicated network for the coarse pass.
pub fn load_model(
    model_path: &Path,
    init_model_path: Option<&Path>,
    intra_threads: Option<usize>
) -> Result<CreStereo<OnnxStereoModel>> {
    let refine = OnnxStereoModel::load(model_path, intra_threads)?;

    let initial = match init_model_path {
        Some(path) => {
            let model = OnnxStereoModel::load(path, intra_threads)?;
            if model.layout().takes_flow_init() {
                return Err(Error::Model(format!(
                    "initial model {:?} must not take a flow seed",
                    path
                )));
            }
            Some(model)
        },
        None => None
    };

    if initial.is_none() && !refine.layout().takes_flow_init() {
        return Err(Error::Model(format!(
            "model {:?} takes no flow seed, so it cannot refine a coarse prediction",
            model_path
        )));
    }

    Ok(CreStereo::new(refine, initial))
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl InputLayout {
    /// Work out the layout from the network's input names.
    ///
    /// Names containing `left`, `right` and `flow` are matched first, with any remaining inputs
    /// assigned in declaration order.
    pub fn from_input_names(names: &[String]) -> Result<Self> {
        let keys: &[&str] = match names.len() {
            2 => &["left", "right"],
            3 => &["left", "right", "flow"],
            n => return Err(Error::Model(format!(
                "expected 2 or 3 network inputs, found {}: {:?}",
                n, names
            )))
        };

        // Name matches claim their inputs before the rest are handed out in order
        let mut slots: Vec<Option<usize>> = Vec::with_capacity(keys.len());
        for key in keys {
            let hit = names.iter()
                .position(|n| n.to_ascii_lowercase().contains(key))
                .filter(|i| !slots.contains(&Some(*i)));
            slots.push(hit);
        }

        let mut free = (0..names.len()).filter(|i| !slots.contains(&Some(*i)));
        let resolved: Vec<String> = slots
            .iter()
            .map(|slot| slot.or_else(|| free.next()))
            .map(|idx| idx.map(|i| names[i].clone()))
            .collect::<Option<_>>()
            .ok_or_else(|| Error::Model(format!("unusable inputs {:?}", names)))?;

        let mut resolved = resolved.into_iter();
        let mut next = || resolved.next().unwrap_or_default();
        Ok(match keys.len() {
            2 => InputLayout::Initial {
                left: next(),
                right: next()
            },
            _ => InputLayout::Refine {
                left: next(),
                right: next(),
                flow_init: next()
            }
        })
    }

    pub fn takes_flow_init(&self) -> bool {
        matches!(self, InputLayout::Refine { .. })
    }
}

impl OnnxStereoModel {
    /// Load an ONNX network from the given path.
    pub fn load<P: AsRef<Path>>(path: P, intra_threads: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingPath {
                what: "model",
                path: path.to_path_buf()
            });
        }

        let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        info!("Loading model: {}", abs.display());

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?;
        if let Some(n) = intra_threads {
            builder = builder.with_intra_threads(n)?;
        }
        let session = builder.commit_from_file(path)?;

        let names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let layout = InputLayout::from_input_names(&names)?;
        debug!("Model inputs {:?} resolved as {:?}", names, layout);

        Ok(Self {
            session,
            layout,
            path: abs
        })
    }

    pub fn layout(&self) -> &InputLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StereoModel for OnnxStereoModel {
    fn forward(
        &mut self,
        left: &Array4<f32>,
        right: &Array4<f32>,
        flow_init: Option<&Array4<f32>>
    ) -> Result<Array4<f32>> {
        let left_t = Tensor::from_array(left.clone())?;
        let right_t = Tensor::from_array(right.clone())?;

        let outputs = match &self.layout {
            InputLayout::Initial { left: ln, right: rn } => {
                if flow_init.is_some() {
                    return Err(Error::Model("this network does not accept a flow seed".into()));
                }
                self.session.run(ort::inputs![
                    ln.clone() => left_t,
                    rn.clone() => right_t
                ])?
            },
            InputLayout::Refine { left: ln, right: rn, flow_init: fn_ } => {
                // An unseeded pass starts from zero flow at the seed resolution
                let seed = match flow_init {
                    Some(flow) => flow.clone(),
                    None => {
                        let (_, _, h, w) = left.dim();
                        Array4::zeros((1, 2, h / 2, w / 2))
                    }
                };
                let seed_t = Tensor::from_array(seed)?;

                self.session.run(ort::inputs![
                    ln.clone() => left_t,
                    rn.clone() => right_t,
                    fn_.clone() => seed_t
                ])?
            }
        };

        if outputs.len() == 0 {
            return Err(Error::Model("network produced no outputs".into()));
        }

        let flow = outputs[0]
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix4>()?;

        Ok(flow)
    }
}

impl<M: StereoModel> CreStereo<M> {
    pub fn new(refine: M, initial: Option<M>) -> Self {
        Self { refine, initial }
    }

    /// The network used for the unseeded coarse pass.
    pub fn initial_mut(&mut self) -> &mut M {
        match self.initial.as_mut() {
            Some(m) => m,
            None => &mut self.refine
        }
    }

    pub fn refine_mut(&mut self) -> &mut M {
        &mut self.refine
    }
}

impl<M: StereoModel> StereoModel for CreStereo<M> {
    /// Seeded passes go to the refinement network, unseeded ones to the initial network.
    fn forward(
        &mut self,
        left: &Array4<f32>,
        right: &Array4<f32>,
        flow_init: Option<&Array4<f32>>
    ) -> Result<Array4<f32>> {
        match flow_init {
            Some(_) => self.refine.forward(left, right, flow_init),
            None => self.initial_mut().forward(left, right, None)
        }
    }
}
