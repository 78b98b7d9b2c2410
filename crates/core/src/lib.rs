//! Face-mask detection: locate faces, classify each as masked or not, and
//! draw the result onto the frame.

pub mod annotation {
    pub mod domain {
        pub mod annotation;
        pub mod face_preprocessor;
        pub mod frame_annotator;
    }
}

pub mod classification {
    pub mod domain {
        pub mod mask_classifier;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod annotate_image_use_case;
    pub mod annotate_stream_use_case;
    pub mod frame_processor;
    pub mod frame_report;
    pub mod pipeline_logger;
}

pub mod rendering {
    pub mod domain {
        pub mod annotation_renderer;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod settings;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod frame_resizer;
        pub mod image_writer;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}
