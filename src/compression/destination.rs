/// Random access to the bytes a [`Decompressor`](super::Decompressor) produces.
///
/// Writes always happen in order, `0, 1, 2, ...`, without gaps or repeats. Reads only
/// ever ask for an offset that has already been written.
pub trait Destination {
    fn read(&mut self, offset: usize) -> u8;
    fn write(&mut self, offset: usize, value: u8);

    /// Number of bytes the destination can hold, if it is bounded.
    fn capacity(&self) -> Option<usize> {
        None
    }
}

impl<D: Destination + ?Sized> Destination for &mut D {
    fn read(&mut self, offset: usize) -> u8 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u8) {
        (**self).write(offset, value)
    }

    fn capacity(&self) -> Option<usize> {
        (**self).capacity()
    }
}

/// Decompress straight into a contiguous buffer, either owned (`Vec<u8>`) or borrowed
/// (`&mut [u8]`).
#[derive(Debug, Clone)]
pub struct MemoryDestination<B> {
    buf: B,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> MemoryDestination<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn data(&self) -> &[u8] {
        self.buf.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Destination for MemoryDestination<B> {
    fn read(&mut self, offset: usize) -> u8 {
        self.buf.as_ref()[offset]
    }

    fn write(&mut self, offset: usize, value: u8) {
        self.buf.as_mut()[offset] = value;
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.buf.as_ref().len())
    }
}

/// Defer all I/O to a pair of user functions.
///
/// Both functions get the same `user` context, which is how they share whatever
/// storage the output lives in (a file, a ring buffer, ...).
pub struct CallbackDestination<U, R, W> {
    read: R,
    write: W,
    user: U,
}

impl<U, R, W> CallbackDestination<U, R, W>
where
    R: FnMut(usize, &mut U) -> u8,
    W: FnMut(usize, u8, &mut U),
{
    pub fn new(read: R, write: W, user: U) -> Self {
        Self { read, write, user }
    }

    pub fn user(&self) -> &U {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut U {
        &mut self.user
    }

    pub fn into_user(self) -> U {
        self.user
    }
}

impl<U, R, W> Destination for CallbackDestination<U, R, W>
where
    R: FnMut(usize, &mut U) -> u8,
    W: FnMut(usize, u8, &mut U),
{
    fn read(&mut self, offset: usize) -> u8 {
        (self.read)(offset, &mut self.user)
    }

    fn write(&mut self, offset: usize, value: u8) {
        (self.write)(offset, value, &mut self.user)
    }
}
