use ash::vk;
use log::{debug, warn};
use snafu::{OptionExt, ResultExt, Snafu};
use std::path::{Path, PathBuf};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to initialize the shader compiler"))]
    CreateCompiler,

    #[snafu(display("Failed to initialize the shader compile options"))]
    CreateCompileOptions,

    #[snafu(display("Failed to read shader source '{}': {}", path.display(), source))]
    ReadShaderSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Shader stage {:?} cannot be compiled", stage))]
    UnsupportedStage { stage: vk::ShaderStageFlags },

    #[snafu(display("Failed to compile '{}':\n{}", name, source))]
    CompileShader {
        name: String,
        source: shaderc::Error,
    },
}

/// Compiles HLSL sources into SPIR-V at runtime.
pub struct ShaderCompiler {
    compiler: shaderc::Compiler,
    options: shaderc::CompileOptions<'static>,
}

impl ShaderCompiler {
    pub const ENTRY_POINT_NAME: &'static str = "main";

    pub fn new() -> Result<Self> {
        let compiler = shaderc::Compiler::new().context(CreateCompiler)?;
        let mut options = shaderc::CompileOptions::new().context(CreateCompileOptions)?;
        options.set_source_language(shaderc::SourceLanguage::HLSL);
        options.set_invert_y(true);
        if cfg!(debug_assertions) {
            options.set_generate_debug_info();
        }
        Ok(Self { compiler, options })
    }

    pub fn compile_file(
        &mut self,
        path: impl AsRef<Path>,
        stage: vk::ShaderStageFlags,
    ) -> Result<Vec<u32>> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).context(ReadShaderSource { path })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.compile_source(&source, &name, stage)
    }

    pub fn compile_source(
        &mut self,
        source: &str,
        name: &str,
        stage: vk::ShaderStageFlags,
    ) -> Result<Vec<u32>> {
        let kind = Self::shader_kind(stage)?;
        let artifact = self
            .compiler
            .compile_into_spirv(
                source,
                kind,
                name,
                Self::ENTRY_POINT_NAME,
                Some(&self.options),
            )
            .context(CompileShader { name })?;

        if artifact.get_num_warnings() > 0 {
            warn!(
                "Shader '{}' compiled with warnings:\n{}",
                name,
                artifact.get_warning_messages()
            );
        }
        debug!("Compiled shader '{}' ({} words)", name, artifact.len() / 4);

        Ok(artifact.as_binary().to_vec())
    }

    fn shader_kind(stage: vk::ShaderStageFlags) -> Result<shaderc::ShaderKind> {
        match stage {
            vk::ShaderStageFlags::VERTEX => Ok(shaderc::ShaderKind::Vertex),
            vk::ShaderStageFlags::FRAGMENT => Ok(shaderc::ShaderKind::Fragment),
            _ => UnsupportedStage { stage }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn compiles_mesh_vertex_shader() {
        let mut compiler = ShaderCompiler::new().unwrap();
        let words = compiler
            .compile_file("assets/shaders/mesh/mesh.vert.hlsl", vk::ShaderStageFlags::VERTEX)
            .unwrap();
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn compiles_mesh_fragment_shader() {
        let mut compiler = ShaderCompiler::new().unwrap();
        let words = compiler
            .compile_file(
                "assets/shaders/mesh/mesh.frag.hlsl",
                vk::ShaderStageFlags::FRAGMENT,
            )
            .unwrap();
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn syntax_errors_carry_the_compiler_message() {
        let mut compiler = ShaderCompiler::new().unwrap();
        let error = compiler
            .compile_source(
                "float4 main() : SV_POSITION { return oops; }",
                "broken.vert",
                vk::ShaderStageFlags::VERTEX,
            )
            .unwrap_err();
        assert!(error.to_string().contains("broken.vert"));
    }

    #[test]
    fn missing_file_is_reported() {
        let mut compiler = ShaderCompiler::new().unwrap();
        let error = compiler
            .compile_file("assets/shaders/missing.hlsl", vk::ShaderStageFlags::VERTEX)
            .unwrap_err();
        assert!(matches!(error, Error::ReadShaderSource { .. }));
    }

    #[test]
    fn only_vertex_and_fragment_stages_are_supported() {
        let mut compiler = ShaderCompiler::new().unwrap();
        let error = compiler
            .compile_source("", "compute", vk::ShaderStageFlags::COMPUTE)
            .unwrap_err();
        assert!(matches!(error, Error::UnsupportedStage { .. }));
    }
}
