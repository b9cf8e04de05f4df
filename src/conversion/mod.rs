use anyhow::{anyhow, Result};
use greedy_compress::buffer::PixelBuffer;
use greedy_compress::source::thumbnail;
use gtk::gdk_pixbuf::{Colorspace, Pixbuf};
use itertools::iproduct;

/// Converts a `PixelBuffer` to a gtk `Pixbuf` at full size
pub fn buffer_to_pixbuf(buffer: &PixelBuffer) -> Result<Pixbuf> {
    let pix = Pixbuf::new(
        Colorspace::Rgb,
        false,
        8,
        buffer.width() as i32,
        buffer.height() as i32,
    )
    .ok_or_else(|| {
        anyhow!(
            "Unable to allocate {}x{} pixbuf",
            buffer.width(),
            buffer.height()
        )
    })?;

    iproduct!(0..buffer.height(), 0..buffer.width()).for_each(|(y, x)| {
        let [r, g, b] = buffer.get(x, y);
        pix.put_pixel(x as u32, y as u32, r, g, b, 255);
    });
    Ok(pix)
}

/// Scales the buffer down to the preview size, then converts it
pub fn preview_pixbuf(buffer: &PixelBuffer) -> Result<Pixbuf> {
    buffer_to_pixbuf(&thumbnail(buffer)?)
}
