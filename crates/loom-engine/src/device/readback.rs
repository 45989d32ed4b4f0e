use std::sync::mpsc::channel;

use anyhow::{Context, Result};

/// Maps a `MAP_READ` buffer and copies its whole contents out.
///
/// Blocks on the device until the mapping resolves. The buffer is unmapped
/// before returning.
pub(crate) fn map_read(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
    let slice = buffer.slice(..);
    let (tx, rx) = channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed during readback")?;
    rx.recv()
        .context("map callback dropped")?
        .context("buffer mapping failed")?;

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(bytes)
}

/// Copies the first `size` bytes of `src` into a staging buffer and reads them.
///
/// `src` must carry `COPY_SRC`. `size` is rounded up to the copy alignment;
/// only `size` bytes are returned.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>> {
    if size == 0 {
        return Ok(Vec::new());
    }
    let aligned = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
    anyhow::ensure!(
        aligned <= src.size(),
        "readback of {size} bytes exceeds buffer size {}",
        src.size()
    );

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("loom readback staging"),
        size: aligned,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("loom readback encoder"),
    });
    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, aligned);
    queue.submit(std::iter::once(encoder.finish()));

    let mut bytes = map_read(device, &staging)?;
    bytes.truncate(size as usize);
    Ok(bytes)
}
