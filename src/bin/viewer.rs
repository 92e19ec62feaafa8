use log::{error, info};
use nalgebra_glm as glm;
use std::{error::Error, sync::Arc};
use support::{
    app::{run_app, setup_app, App, AppResult, AppState},
    camera::{CameraInput, FlyCamera},
    logger::create_logger,
    settings::DemoSettings,
    vulkan::{
        compile_mesh_shaders, create_mesh_pipeline, Command, CommandResult, MeshAsset,
        MeshPipelineData, MeshRenderer, RenderPipeline, SceneUniforms, ShaderCompiler,
        VulkanContext, VulkanSwapchain,
    },
};

fn main() {
    let settings = DemoSettings::from_args(std::env::args());

    if let Err(error) = create_logger(&settings.log_file_path) {
        eprintln!("{}", error);
        std::process::exit(1);
    }

    if let Err(error) = run(settings) {
        error!("{}", error);
        std::process::exit(1);
    }
}

fn run(settings: DemoSettings) -> Result<(), Box<dyn Error>> {
    info!("Loading '{}'", settings.model_path.display());
    let asset = MeshAsset::load(&settings.model_path)?;

    let (window, event_loop, renderer) = setup_app(&settings)?;
    let context = renderer.context.clone();

    let mut compiler = ShaderCompiler::new()?;
    let shader_set = compile_mesh_shaders(
        context.clone(),
        &mut compiler,
        &settings.vertex_shader_path,
        &settings.fragment_shader_path,
    )?;

    let pipeline_data = MeshPipelineData::new(
        context.clone(),
        &renderer.transient_command_pool,
        &asset,
        shader_set,
    )?;

    let app = Viewer::new(context, renderer.vulkan_swapchain()?, pipeline_data, settings)?;
    run_app(app, window, event_loop, renderer);
    Ok(())
}

// Pipeline goes before the data it was built from
struct Viewer {
    pipeline: Option<RenderPipeline>,
    pipeline_data: Option<MeshPipelineData>,
    camera: FlyCamera,
    aspect_ratio: f32,
    settings: DemoSettings,
}

impl Viewer {
    fn new(
        context: Arc<VulkanContext>,
        swapchain: &VulkanSwapchain,
        pipeline_data: MeshPipelineData,
        settings: DemoSettings,
    ) -> Result<Self, Box<dyn Error>> {
        let pipeline = create_mesh_pipeline(
            context,
            swapchain.render_pass.clone(),
            &pipeline_data,
        )?;
        Ok(Self {
            pipeline: Some(pipeline),
            pipeline_data: Some(pipeline_data),
            camera: FlyCamera::new(settings.camera_speed),
            aspect_ratio: swapchain.swapchain.properties().aspect_ratio(),
            settings,
        })
    }

    fn scene_uniforms(&self) -> SceneUniforms {
        let [r, g, b, a] = self.settings.light_colour;
        let [x, y, z] = self.settings.light_direction;
        let position = self.camera.position();
        SceneUniforms {
            view: self.camera.view_matrix(),
            projection: FlyCamera::projection_matrix(
                self.aspect_ratio,
                self.settings.field_of_view,
                self.settings.near_plane,
                self.settings.far_plane,
            ),
            light_colour: glm::vec4(r, g, b, a),
            light_direction: glm::vec4(x, y, z, 0.0),
            camera_position: glm::vec4(position.x, position.y, position.z, 1.0),
        }
    }
}

impl App for Viewer {
    fn update(&mut self, state: &mut AppState) -> AppResult {
        let input = CameraInput::from_input(&mut state.input);
        self.camera
            .update(&input, state.delta_time, state.window_dimensions);
        Ok(())
    }
}

impl Command for Viewer {
    fn prepare_frame(&mut self, frame_index: usize) -> CommandResult {
        let uniforms = self.scene_uniforms();
        if let Some(pipeline_data) = self.pipeline_data.as_ref() {
            pipeline_data.update_frame(frame_index, &uniforms)?;
        }
        Ok(())
    }

    fn issue_commands(
        &mut self,
        device: &ash::Device,
        command_buffer: ash::vk::CommandBuffer,
        frame_index: usize,
    ) -> CommandResult {
        if let (Some(pipeline), Some(pipeline_data)) =
            (self.pipeline.as_ref(), self.pipeline_data.as_ref())
        {
            let renderer = MeshRenderer::new(command_buffer, pipeline, pipeline_data, frame_index)?;
            renderer.draw(device, pipeline, &pipeline_data.geometry);
        }
        Ok(())
    }

    fn recreate_pipelines(
        &mut self,
        context: Arc<VulkanContext>,
        swapchain: &VulkanSwapchain,
    ) -> CommandResult {
        self.aspect_ratio = swapchain.swapchain.properties().aspect_ratio();
        self.pipeline = None;
        if let Some(pipeline_data) = self.pipeline_data.as_ref() {
            self.pipeline = Some(create_mesh_pipeline(
                context,
                swapchain.render_pass.clone(),
                pipeline_data,
            )?);
        }
        Ok(())
    }

    fn release_resources(&mut self) {
        info!("Releasing mesh pipeline");
        self.pipeline = None;
        info!("Releasing mesh resources");
        self.pipeline_data = None;
    }
}
