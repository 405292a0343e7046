//! Registry enumeration and global binding

use std::ffi::CString;
use std::sync::{Arc, Mutex};

use waypost_backend::client::{Backend, ObjectData, ObjectId};
use waypost_backend::message;
use waypost_backend::protocol::{Argument, Interface, Message};
use waypost_backend::{InvalidId, WaylandError, WL_REGISTRY_INTERFACE};

use crate::Connection;

/// One globally advertised interface
#[derive(Debug, Clone)]
pub struct GlobalDesc {
    /// the opaque name token used to bind it
    pub name: u32,
    /// the interface name
    pub interface: String,
    /// the version the server supports
    pub version: u32,
}

/// The list of globals advertised by the server
///
/// Obtained with [`GlobalList::new`], which binds the registry and
/// round-trips once so the initial enumeration is complete. The registry
/// stays alive: later `global`/`global_remove` events keep the list
/// current whenever the connection dispatches.
#[derive(Debug)]
pub struct GlobalList {
    registry: ObjectId,
    contents: Arc<RegistryData>,
}

impl GlobalList {
    /// Bind the registry and collect the initial advertisement
    pub fn new(conn: &Connection) -> Result<Self, WaylandError> {
        let contents = Arc::new(RegistryData::default());
        let registry = conn
            .backend()
            .send_request(
                // wl_display.get_registry(new id)
                message!(conn.display(), 1, [Argument::NewId(Backend::null_id())]),
                Some(contents.clone()),
                Some((&WL_REGISTRY_INTERFACE, 1)),
            )
            .map_err(|_| {
                conn.backend().last_error().unwrap_or_else(|| {
                    WaylandError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "get_registry failed",
                    ))
                })
            })?;
        conn.roundtrip()?;
        Ok(Self { registry, contents })
    }

    /// A snapshot of the currently known globals
    pub fn contents(&self) -> Vec<GlobalDesc> {
        self.contents.globals.lock().unwrap().clone()
    }

    /// Find the advertisement for an interface, if any
    pub fn find(&self, interface: &str) -> Option<GlobalDesc> {
        self.contents
            .globals
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.interface == interface)
            .cloned()
    }

    /// Bind a global, creating a protocol object for it
    ///
    /// The bound version is `min(requested, advertised)`; the server never
    /// upgrades. Fails with `InvalidId` if the interface is not currently
    /// advertised.
    pub fn bind(
        &self,
        conn: &Connection,
        interface: &'static Interface,
        version: u32,
        data: Arc<dyn ObjectData>,
    ) -> Result<ObjectId, InvalidId> {
        let global = self.find(interface.name).ok_or(InvalidId)?;
        let version = version.min(global.version);
        conn.backend().send_request(
            // wl_registry.bind(name, interface, version, new id)
            message!(
                self.registry.clone(),
                0,
                [
                    Argument::Uint(global.name),
                    Argument::Str(Some(Box::new(CString::new(interface.name).unwrap()))),
                    Argument::Uint(version),
                    Argument::NewId(Backend::null_id()),
                ]
            ),
            Some(data),
            Some((interface, version)),
        )
    }

    /// The registry object backing this list
    pub fn registry(&self) -> ObjectId {
        self.registry.clone()
    }
}

#[derive(Debug, Default)]
struct RegistryData {
    globals: Mutex<Vec<GlobalDesc>>,
}

impl ObjectData for RegistryData {
    fn event(
        self: Arc<Self>,
        _backend: &Backend,
        msg: Message<ObjectId, std::os::unix::io::OwnedFd>,
    ) -> Option<Arc<dyn ObjectData>> {
        match msg.opcode {
            // wl_registry.global(name, interface, version)
            0 => {
                if let [Argument::Uint(name), Argument::Str(Some(ref interface)), Argument::Uint(version)] =
                    msg.args[..]
                {
                    self.globals.lock().unwrap().push(GlobalDesc {
                        name,
                        interface: interface.to_string_lossy().into_owned(),
                        version,
                    });
                }
            }
            // wl_registry.global_remove(name)
            1 => {
                if let [Argument::Uint(name)] = msg.args[..] {
                    self.globals.lock().unwrap().retain(|g| g.name != name);
                }
            }
            _ => unreachable!(),
        }
        None
    }

    fn destroyed(&self, _object_id: ObjectId) {}
}
