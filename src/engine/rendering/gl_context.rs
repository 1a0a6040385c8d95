use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::gl_api::{GlApi, GlowBackend};

/// Error flag reported by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlError {
    pub code: u32,
}

impl GlError {
    pub fn name(&self) -> &'static str {
        match self.code {
            glow::INVALID_ENUM => "GL_INVALID_ENUM",
            glow::INVALID_VALUE => "GL_INVALID_VALUE",
            glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
            glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
            glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
            _ => "unknown GL error",
        }
    }
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.name(), self.code)
    }
}

impl std::error::Error for GlError {}

struct ContextInner {
    api: Box<dyn GlApi>,
    active_program: Cell<Option<glow::Program>>,
}

/// Handle to the current OpenGL context.
///
/// Every GPU object keeps a clone. The handle is reference counted with `Rc`,
/// so it (and everything holding it) stays on the thread that owns the context.
#[derive(Clone)]
pub struct GlContext {
    inner: Rc<ContextInner>,
}

impl GlContext {
    /// # Safety
    /// The context behind `gl` must be current on this thread for the
    /// lifetime of the returned handle and all of its clones.
    pub unsafe fn from_glow(gl: glow::Context) -> Self {
        Self::with_api(GlowBackend::new(gl))
    }

    pub fn with_api(api: impl GlApi + 'static) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                api: Box::new(api),
                active_program: Cell::new(None),
            }),
        }
    }

    pub fn gl(&self) -> &dyn GlApi {
        self.inner.api.as_ref()
    }

    /// Reads the GL error flag.
    pub fn check_error(&self) -> Result<(), GlError> {
        match self.gl().get_error() {
            glow::NO_ERROR => Ok(()),
            code => Err(GlError { code }),
        }
    }

    pub(crate) fn active_program(&self) -> Option<glow::Program> {
        self.inner.active_program.get()
    }

    pub(crate) fn set_active_program(&self, program: Option<glow::Program>) {
        self.gl().use_program(program);
        self.inner.active_program.set(program);
    }
}

impl fmt::Debug for GlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlContext")
            .field("active_program", &self.active_program())
            .finish()
    }
}
