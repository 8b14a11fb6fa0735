use crate::core::reflect::ShaderError;
use crate::traits::render_device::{ProgramId, RenderDevice, UniformValue};

/// Owning wrapper around a device program
///
/// Uniform loads are only forwarded while the program is started.
#[derive(Debug, Default)]
pub struct ShaderProgram {
    id: Option<ProgramId>,
    started: bool,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and link, replacing any program already held
    pub fn link(
        &mut self,
        device: &mut dyn RenderDevice,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<(), ShaderError> {
        self.release(device);
        let id = device.create_program(vertex_source, fragment_source)?;
        log::debug!("linked program {:?}", id);
        self.id = Some(id);
        Ok(())
    }

    pub fn id(&self) -> Option<ProgramId> {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn attribute_location(&self, device: &dyn RenderDevice, name: &str) -> Option<u32> {
        device.attribute_location(self.id?, name)
    }

    pub fn start(&mut self, device: &mut dyn RenderDevice) {
        if let Some(id) = self.id {
            device.use_program(Some(id));
            self.started = true;
        }
    }

    pub fn stop(&mut self, device: &mut dyn RenderDevice) {
        if self.started {
            device.use_program(None);
            self.started = false;
        }
    }

    /// Delete the device program; safe to call when nothing is held
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.stop(device);
        if let Some(id) = self.id.take() {
            device.delete_program(id);
        }
    }

    pub fn set_uniform(&self, device: &mut dyn RenderDevice, name: &str, value: UniformValue) {
        match self.id {
            Some(id) if self.started => device.set_uniform(id, name, value),
            _ => log::warn!("dropping uniform `{}`: program is not started", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::null_device::{DeviceOp, NullDevice};

    const VERTEX: &str = include_str!("../data/shaders/light-advanced.vert.wgsl");
    const FRAGMENT: &str = include_str!("../data/shaders/light-advanced.frag.wgsl");

    #[test]
    fn uniforms_require_a_started_program() {
        let mut device = NullDevice::new();
        let mut program = ShaderProgram::new();
        program.link(&mut device, VERTEX, FRAGMENT).unwrap();
        let id = program.id().unwrap();

        program.set_uniform(&mut device, "LightSourcePosition", UniformValue::Float(1.0));
        assert_eq!(device.uniform(id, "LightSourcePosition"), None);

        program.start(&mut device);
        program.set_uniform(&mut device, "LightSourcePosition", UniformValue::Float(2.0));
        assert_eq!(
            device.uniform(id, "LightSourcePosition"),
            Some(UniformValue::Float(2.0))
        );
    }

    #[test]
    fn release_stops_and_deletes() {
        let mut device = NullDevice::new();
        let mut program = ShaderProgram::new();
        program.link(&mut device, VERTEX, FRAGMENT).unwrap();
        let id = program.id().unwrap();
        program.start(&mut device);

        program.release(&mut device);
        program.release(&mut device);

        let ops = device.ops();
        assert_eq!(&ops[ops.len() - 2..], &[DeviceOp::UseProgram(None), DeviceOp::DeleteProgram(id)]);
        assert!(!program.is_ready());
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn failed_link_leaves_program_empty() {
        let mut device = NullDevice::new();
        let mut program = ShaderProgram::new();
        assert!(program.link(&mut device, "not wgsl", FRAGMENT).is_err());
        assert!(!program.is_ready());
        assert_eq!(program.attribute_location(&device, "position"), None);
    }
}
