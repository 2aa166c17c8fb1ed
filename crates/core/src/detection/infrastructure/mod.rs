pub mod math;
pub mod onnx_yunet_detector;
