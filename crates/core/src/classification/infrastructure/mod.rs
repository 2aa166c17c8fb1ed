pub mod onnx_deepfake_classifier;
