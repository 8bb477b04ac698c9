//! FUSE adapter: maps the kernel's inode-based protocol onto the
//! path-addressed [`VirtualFs`] engine.
//!
//! Inodes are assigned lazily as paths are looked up and remembered in
//! an [`InodeTable`]; attributes use a zero TTL so listings always
//! reflect the current tagging state.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use fuser::{
    FUSE_ROOT_ID, FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, Request, TimeOrNow,
};
use log::{debug, error, info};

use super::{Attributes, EntryKind, VfsError, VirtualFs};
use crate::storage::Storage;

const TTL: Duration = Duration::ZERO;

/// Mounts the virtual filesystem over the given storage and serves
/// protocol requests until the filesystem is unmounted.
pub fn mount(store: Storage, mountpoint: &Path) -> Result<()> {
    let options = [
        MountOption::FSName("tagfs".to_string()),
        MountOption::NoAtime,
    ];

    info!("mounting tagfs at '{}'", mountpoint.display());
    fuser::mount2(TagFs::new(VirtualFs::new(store)), mountpoint, &options)
        .with_context(|| format!("could not mount tagfs at '{}'", mountpoint.display()))
}

/// Bidirectional inode/path mapping, grown lazily as the kernel looks
/// paths up. The root inode is fixed and maps to the empty path.
struct InodeTable {
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut table = Self {
            paths: HashMap::new(),
            inodes: HashMap::new(),
            next: FUSE_ROOT_ID + 1,
        };
        table.paths.insert(FUSE_ROOT_ID, String::new());
        table.inodes.insert(String::new(), FUSE_ROOT_ID);
        table
    }

    fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    fn intern(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }

        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_string());
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    fn forget_path(&mut self, path: &str) {
        if let Some(ino) = self.inodes.remove(path) {
            self.paths.remove(&ino);
        }
    }
}

/// The `fuser::Filesystem` host for [`VirtualFs`].
pub struct TagFs {
    vfs: VirtualFs,
    inodes: InodeTable,
}

impl TagFs {
    /// Creates the FUSE host around a projection engine.
    pub fn new(vfs: VirtualFs) -> Self {
        Self {
            vfs,
            inodes: InodeTable::new(),
        }
    }

    fn file_attr(&self, req: &Request<'_>, ino: u64, attributes: &Attributes) -> FileAttr {
        let (kind, perm, nlink) = match attributes.kind() {
            EntryKind::Directory => (FileType::Directory, 0o755, 2),
            EntryKind::Link => (FileType::Symlink, 0o755, 1),
            EntryKind::Document => (FileType::RegularFile, 0o444, 1),
        };
        let mtime = attributes.modified().unwrap_or(UNIX_EPOCH);

        FileAttr {
            ino,
            size: attributes.size(),
            blocks: attributes.size().div_ceil(512),
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind,
            perm,
            nlink,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

/// Translates a projection failure into an errno for the kernel.
/// Storage failures are logged and reported as a generic I/O error.
fn errno(error: &VfsError) -> i32 {
    match error {
        VfsError::NotFound => libc::ENOENT,
        VfsError::NotPermitted => libc::EPERM,
        VfsError::InvalidArgument => libc::EINVAL,
        VfsError::DirectoryNotEmpty => libc::ENOTEMPTY,
        VfsError::Unsupported => libc::ENOSYS,
        VfsError::Storage(cause) => {
            error!("storage failure: {cause:#}");
            libc::EIO
        }
    }
}

fn child_path(parent: &str, name: &OsStr) -> Option<String> {
    let name = name.to_str()?;
    if parent.is_empty() {
        Some(name.to_string())
    } else {
        Some(format!("{parent}/{name}"))
    }
}

fn parent_path(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

impl Filesystem for TagFs {
    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent) = self.inodes.path(parent).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(&parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.attributes(&path) {
            Ok(attributes) => {
                let ino = self.inodes.intern(&path);
                reply.entry(&TTL, &self.file_attr(req, ino, &attributes), 0);
            }
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.inodes.path(ino).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.attributes(&path) {
            Ok(attributes) => reply.attr(&TTL, &self.file_attr(req, ino, &attributes)),
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let Some(path) = self.inodes.path(ino).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.read_link(&path) {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inodes.path(ino).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };

        let entries = match self.vfs.read_dir(&path) {
            Ok(entries) => entries,
            Err(error) => {
                reply.error(errno(&error));
                return;
            }
        };

        let parent_ino = self.inodes.intern(parent_path(&path));
        let mut listing: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];
        for entry in entries {
            let child = match child_path(&path, OsStr::new(entry.name())) {
                Some(child) => child,
                None => continue,
            };
            let kind = match entry.kind() {
                EntryKind::Directory => FileType::Directory,
                EntryKind::Link => FileType::Symlink,
                EntryKind::Document => FileType::RegularFile,
            };
            listing.push((self.inodes.intern(&child), kind, entry.name().to_string()));
        }

        for (index, (ino, kind, name)) in listing.into_iter().enumerate().skip(offset as usize) {
            if reply.add(ino, (index + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(parent) = self.inodes.path(parent).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(&parent, name) else {
            reply.error(libc::EINVAL);
            return;
        };

        if let Err(error) = self.vfs.make_dir(&path) {
            reply.error(errno(&error));
            return;
        }

        match self.vfs.attributes(&path) {
            Ok(attributes) => {
                let ino = self.inodes.intern(&path);
                reply.entry(&TTL, &self.file_attr(req, ino, &attributes), 0);
            }
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent) = self.inodes.path(parent).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(&parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.remove_dir(&path) {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(old_parent), Some(new_parent)) = (
            self.inodes.path(parent).map(String::from),
            self.inodes.path(newparent).map(String::from),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };
        let (Some(old_path), Some(new_path)) = (
            child_path(&old_parent, name),
            child_path(&new_parent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.rename(&old_path, &new_path) {
            Ok(()) => {
                self.inodes.forget_path(&old_path);
                reply.ok();
            }
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent) = self.inodes.path(parent).map(String::from) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(path) = child_path(&parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.unlink(&path) {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.read_document(path) {
            Ok(_) => reply.opened(0, 0),
            Err(error) => reply.error(errno(&error)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.vfs.read_document(path) {
            Ok(body) => {
                let start = (offset as usize).min(body.len());
                let end = (start + size as usize).min(body.len());
                reply.data(&body[start..end]);
            }
            Err(error) => reply.error(errno(&error)),
        }
    }

    // The remaining mutating protocol calls are uniformly unsupported.

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("setattr({ino}) rejected");
        reply.error(libc::ENOSYS);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        debug!("mknod({parent}, {name:?}) rejected");
        reply.error(libc::ENOSYS);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        debug!("create({parent}, {name:?}) rejected");
        reply.error(libc::ENOSYS);
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _newparent: u64,
        _newname: &OsStr,
        reply: ReplyEntry,
    ) {
        debug!("link({ino}) rejected");
        reply.error(libc::ENOSYS);
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _link: &Path,
        reply: ReplyEntry,
    ) {
        debug!("symlink({parent}, {name:?}) rejected");
        reply.error(libc::ENOSYS);
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        debug!("setxattr({ino}) rejected");
        reply.error(libc::ENOSYS);
    }
}
