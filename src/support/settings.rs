use derive_builder::Builder;
use std::path::PathBuf;

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into), default)]
pub struct DemoSettings {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub model_path: PathBuf,
    pub vertex_shader_path: PathBuf,
    pub fragment_shader_path: PathBuf,
    pub log_file_path: PathBuf,
    /// World units per second.
    pub camera_speed: f32,
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub light_colour: [f32; 4],
    pub light_direction: [f32; 3],
    pub clear_colour: [f32; 4],
    pub enable_validation: bool,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            window_title: "glTF Viewer".to_string(),
            window_width: 800,
            window_height: 600,
            model_path: PathBuf::from("assets/models/Triangle/Triangle.gltf"),
            vertex_shader_path: PathBuf::from("assets/shaders/mesh/mesh.vert.hlsl"),
            fragment_shader_path: PathBuf::from("assets/shaders/mesh/mesh.frag.hlsl"),
            log_file_path: PathBuf::from("viewer.log"),
            camera_speed: 1.0,
            field_of_view: 65.0,
            near_plane: 0.01,
            far_plane: 10000.0,
            light_colour: [0.9, 0.9, 1.0, 1.0],
            light_direction: [-1.0, -1.0, 1.0],
            clear_colour: [0.1, 0.1, 0.1, 1.0],
            enable_validation: cfg!(any(debug_assertions, feature = "validation")),
        }
    }
}

impl DemoSettings {
    /// Defaults, with the model path taken from the first positional argument.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut settings = Self::default();
        if let Some(model_path) = args.into_iter().skip(1).map(Into::into).next() {
            settings.model_path = PathBuf::from(model_path);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_demo_scene() {
        let settings = DemoSettings::default();
        assert_eq!((settings.window_width, settings.window_height), (800, 600));
        assert_eq!(settings.field_of_view, 65.0);
        assert_eq!(settings.light_colour, [0.9, 0.9, 1.0, 1.0]);
        assert_eq!(settings.light_direction, [-1.0, -1.0, 1.0]);
        assert!(settings.near_plane > 0.0 && settings.near_plane < settings.far_plane);
    }

    #[test]
    fn first_argument_overrides_model_path() {
        let settings = DemoSettings::from_args(vec!["viewer", "models/box.gltf", "ignored"]);
        assert_eq!(settings.model_path, PathBuf::from("models/box.gltf"));
    }

    #[test]
    fn without_arguments_the_default_model_is_used() {
        let settings = DemoSettings::from_args(vec!["viewer"]);
        assert_eq!(settings.model_path, DemoSettings::default().model_path);
    }

    #[test]
    fn builder_fills_unset_fields_with_defaults() {
        let settings = DemoSettingsBuilder::default()
            .window_title("Test")
            .camera_speed(2.0_f32)
            .build()
            .unwrap();
        assert_eq!(settings.window_title, "Test");
        assert_eq!(settings.camera_speed, 2.0);
        assert_eq!(settings.far_plane, DemoSettings::default().far_plane);
    }

    #[test]
    fn default_model_ships_with_the_repository() {
        let settings = DemoSettings::default();
        assert!(settings.model_path.is_file());
        assert!(crate::vulkan::MeshAsset::load(&settings.model_path).is_ok());
    }
}
