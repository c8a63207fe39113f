//! Scene classification CNN on the burn ndarray (CPU) backend.
//!
//! The architecture is built with freshly initialised parameters; pre-trained
//! weights come from a burn record file written with
//! `DefaultFileRecorder<FullPrecisionSettings>`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use burn::backend::NdArray;
use burn::backend::ndarray::NdArrayDevice;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::record::{DefaultFileRecorder, FullPrecisionSettings};
use burn::tensor::activation::softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use scenery_core::InputTensor;
use tracing::info;

use crate::preprocess::INPUT_SIZE;
use crate::provider::{Model, ModelProvider};
use crate::ProviderError;

const IN_CHANNELS: usize = 3;
const FEATURES: usize = 64;

/// Shape parameters of [`SceneNet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneNetConfig {
    pub num_classes: usize,
    /// Side of the square RGB input.
    pub image_size: usize,
}

impl SceneNetConfig {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            image_size: INPUT_SIZE as usize,
        }
    }

    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.image_size = image_size;
        self
    }

    /// Spatial side of the last feature map, or 0 if the input is too small.
    ///
    /// Unpadded 3x3 convs shrink by 2, each 2x2 pool halves.
    fn feature_map_size(&self) -> usize {
        let after_conv1 = self.image_size.saturating_sub(2);
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1.saturating_sub(2);
        let after_pool2 = after_conv2 / 2;
        after_pool2.saturating_sub(2)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<SceneNet<B>, ProviderError> {
        if self.num_classes == 0 {
            return Err(ProviderError::Construction(
                "network needs at least one output class".into(),
            ));
        }
        if self.feature_map_size() == 0 {
            return Err(ProviderError::Construction(format!(
                "input size {0}x{0} is too small",
                self.image_size
            )));
        }

        Ok(SceneNet {
            conv1: Conv2dConfig::new([IN_CHANNELS, 16], [3, 3]).init(device),
            conv2: Conv2dConfig::new([16, 32], [3, 3]).init(device),
            conv3: Conv2dConfig::new([32, FEATURES], [3, 3]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            gap: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            head: LinearConfig::new(FEATURES, self.num_classes).init(device),
            activation: Relu::new(),
        })
    }
}

/// Three conv blocks, global average pooling and a linear head with softmax.
#[derive(Module, Debug)]
pub struct SceneNet<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    gap: AdaptiveAvgPool2d,
    head: Linear<B>,
    activation: Relu,
}

impl<B: Backend> SceneNet<B> {
    /// `[batch, 3, size, size]` images to `[batch, num_classes]` probabilities.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(images));
        let x = self.pool.forward(x);

        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.pool.forward(x);

        let x = self.activation.forward(self.conv3.forward(x));
        let x = self.gap.forward(x);

        let [batch, channels, _, _] = x.dims();
        let x = x.reshape([batch, channels]);

        softmax(self.head.forward(x), 1)
    }
}

/// A [`SceneNet`] on the CPU backend, usable from shared references.
#[derive(Debug)]
pub struct BurnModel {
    net: Mutex<SceneNet<NdArray>>,
    device: NdArrayDevice,
    config: SceneNetConfig,
}

impl BurnModel {
    fn new(net: SceneNet<NdArray>, device: NdArrayDevice, config: SceneNetConfig) -> Self {
        Self {
            net: Mutex::new(net),
            device,
            config,
        }
    }

    fn snapshot(&self) -> Result<SceneNet<NdArray>, ProviderError> {
        self.net
            .lock()
            .map(|net| net.clone())
            .map_err(|_| ProviderError::Runtime("model lock poisoned".into()))
    }

    fn replace(&mut self, net: SceneNet<NdArray>) {
        *self.net.get_mut().unwrap_or_else(|e| e.into_inner()) = net;
    }

    pub fn config(&self) -> SceneNetConfig {
        self.config
    }

    /// Write the current parameters as a record file (`.mpk` is appended).
    pub fn save_weights(&self, path: &Path) -> Result<(), ProviderError> {
        let recorder = DefaultFileRecorder::<FullPrecisionSettings>::new();
        self.snapshot()?
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|e| ProviderError::Weights(format!("{e:?}")))
    }

    fn expected_shape(&self) -> [usize; 4] {
        let side = self.config.image_size;
        [1, IN_CHANNELS, side, side]
    }
}

impl Model for BurnModel {
    fn predict(&self, input: InputTensor) -> Result<Vec<f32>, ProviderError> {
        let shape = input.shape();
        let expected = self.expected_shape();
        if shape != expected {
            return Err(ProviderError::InputShape {
                expected,
                actual: shape,
            });
        }

        let net = self
            .net
            .lock()
            .map_err(|_| ProviderError::Runtime("model lock poisoned".into()))?;

        let data = TensorData::new(input.into_data(), shape)
            .convert::<<NdArray as Backend>::FloatElem>();
        let images = Tensor::<NdArray, 4>::from_data(data, &self.device);

        net.forward(images)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ProviderError::Runtime(format!("{e:?}")))
    }
}

/// Builds [`BurnModel`]s, optionally applying weights from a record file.
#[derive(Debug, Clone)]
pub struct BurnProvider {
    config: SceneNetConfig,
    weights: Option<PathBuf>,
    device: NdArrayDevice,
}

impl BurnProvider {
    pub fn new(num_classes: usize) -> Self {
        Self {
            config: SceneNetConfig::new(num_classes),
            weights: None,
            device: NdArrayDevice::default(),
        }
    }

    pub fn with_weights(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights = Some(path.into());
        self
    }

    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.config = self.config.with_image_size(image_size);
        self
    }

    pub fn config(&self) -> SceneNetConfig {
        self.config
    }
}

/// The file the recorder actually reads: it always uses the `.mpk` extension.
fn record_file(path: &Path) -> PathBuf {
    path.with_extension("mpk")
}

#[async_trait]
impl ModelProvider for BurnProvider {
    type Model = BurnModel;

    async fn create_model(&self) -> Result<BurnModel, ProviderError> {
        let net = self.config.init::<NdArray>(&self.device)?;
        info!(
            classes = self.config.num_classes,
            size = self.config.image_size,
            params = net.num_params(),
            "created scene network"
        );
        Ok(BurnModel::new(net, self.device.clone(), self.config))
    }

    async fn load_weights(&self, model: &mut BurnModel) -> Result<(), ProviderError> {
        let path = self.weights.as_ref().ok_or(ProviderError::NoWeights)?;
        let file = record_file(path);
        if !file.exists() {
            return Err(ProviderError::WeightsNotFound(file));
        }

        let recorder = DefaultFileRecorder::<FullPrecisionSettings>::new();
        let net = model
            .snapshot()?
            .load_file(file.clone(), &recorder, &self.device)
            .map_err(|e| ProviderError::Weights(format!("{e:?}")))?;
        model.replace(net);

        info!(weights = %file.display(), "loaded scene network weights");
        Ok(())
    }
}
