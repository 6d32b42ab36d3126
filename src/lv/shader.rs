use crate::error::{Error, Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub use shaderc::ShaderKind;

fn compile_error(name: &str, message: impl ToString) -> Error {
    Error::ShaderCompile {
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn compiler_and_options(name: &str) -> Result<(shaderc::Compiler, shaderc::CompileOptions<'static>)> {
    let compiler =
        shaderc::Compiler::new().ok_or_else(|| compile_error(name, "shaderc is unavailable"))?;
    let mut options = shaderc::CompileOptions::new()
        .ok_or_else(|| compile_error(name, "shaderc options are unavailable"))?;
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_1 as u32,
    );
    Ok((compiler, options))
}

/// Compiles GLSL source into SPIR-V words.
pub fn compile_glsl(source: &str, kind: ShaderKind, name: &str) -> Result<Vec<u32>> {
    let (compiler, options) = compiler_and_options(name)?;
    let artifact = compiler
        .compile_into_spirv(source, kind, name, "main", Some(&options))
        .map_err(|err| compile_error(name, err))?;
    if artifact.get_num_warnings() > 0 {
        log::warn!("{}: {}", name, artifact.get_warning_messages());
    }
    Ok(artifact.as_binary().to_vec())
}

/// Compiles GLSL source into SPIR-V assembly text.
pub fn compile_glsl_to_assembly(source: &str, kind: ShaderKind, name: &str) -> Result<String> {
    let (compiler, options) = compiler_and_options(name)?;
    let artifact = compiler
        .compile_into_spirv_assembly(source, kind, name, "main", Some(&options))
        .map_err(|err| compile_error(name, err))?;
    Ok(artifact.as_text())
}

pub struct Shader {
    pub handle: vk::ShaderModule,
    pub stage: vk::ShaderStageFlags,
    device: Arc<lv::Device>,
}

impl Shader {
    pub fn from_glsl(
        device: Arc<lv::Device>,
        source: &str,
        kind: ShaderKind,
        name: &str,
    ) -> Result<Shader> {
        let stage = match kind {
            ShaderKind::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderKind::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderKind::Compute => vk::ShaderStageFlags::COMPUTE,
            _ => return Err(compile_error(name, "unsupported shader kind")),
        };
        let code = compile_glsl(source, kind, name)?;
        log::debug!("Compiled {} ({} words)", name, code.len());
        Shader::from_words(device, &code, stage)
    }

    pub fn from_words(
        device: Arc<lv::Device>,
        code: &[u32],
        stage: vk::ShaderStageFlags,
    ) -> Result<Shader> {
        let shader_ci = vk::ShaderModuleCreateInfo {
            s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
            code_size: std::mem::size_of_val(code),
            p_code: code.as_ptr(),
            ..Default::default()
        };
        let shader = unsafe { device.handle.create_shader_module(&shader_ci, None) }
            .check("vkCreateShaderModule")?;
        Ok(Shader {
            handle: shader,
            stage,
            device,
        })
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_shader_module(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;
    const EMPTY_MAIN: &str = "#version 310 es\nvoid main() {}";

    #[test]
    fn compiles_empty_vertex_shader() {
        let binary = compile_glsl(EMPTY_MAIN, ShaderKind::Vertex, "test").unwrap();
        assert_eq!(binary.first().copied(), Some(SPIRV_MAGIC));
    }

    #[test]
    fn assembly_has_spirv_header() {
        let assembly = compile_glsl_to_assembly(EMPTY_MAIN, ShaderKind::Vertex, "test").unwrap();
        assert_eq!(assembly.lines().next(), Some("; SPIR-V"));
    }

    #[test]
    fn bundled_shaders_compile() {
        let sources = [
            (include_str!("../../shaders/triangle.vert"), ShaderKind::Vertex),
            (include_str!("../../shaders/triangle.frag"), ShaderKind::Fragment),
            (include_str!("../../shaders/textured.vert"), ShaderKind::Vertex),
            (include_str!("../../shaders/textured.frag"), ShaderKind::Fragment),
        ];
        for (source, kind) in sources {
            let binary = compile_glsl(source, kind, "bundled").unwrap();
            assert_eq!(binary[0], SPIRV_MAGIC);
        }
    }

    #[test]
    fn syntax_errors_are_reported() {
        let error = compile_glsl("#version 310 es\nvoid main( {", ShaderKind::Fragment, "broken")
            .unwrap_err();
        assert!(matches!(error, Error::ShaderCompile { ref name, .. } if name == "broken"));
    }
}
