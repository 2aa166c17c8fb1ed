//! Deepfake detection core: face candidates, per-face scoring, and the
//! image/video aggregation pipelines that turn them into a single verdict.

/// Boxed error returned by the collaborator traits (detector, classifier,
/// codecs, video reader).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub mod shared {
    pub mod bounding_box;
    pub mod config;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod onnx_session;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod face_candidate_extractor;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod classification {
    pub mod domain {
        pub mod face_classifier;
        pub mod face_scorer;
    }
    pub mod infrastructure;
}

pub mod media {
    pub mod domain {
        pub mod box_overlay;
        pub mod frame_decoder;
        pub mod preview_encoder;
        pub mod video_reader;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod analysis_error;
    pub mod analysis_result;
    pub mod analyze_image_use_case;
    pub mod analyze_video_use_case;
    pub mod frame_analyzer;
    #[cfg(test)]
    pub(crate) mod test_support;
}
