pub trait IterExt: Iterator {
    /// Mutates every item in place as it passes through.
    fn edit<F>(self, f: F) -> Edit<Self, F>
    where
        Self: Sized,
        F: FnMut(&mut Self::Item),
    {
        Edit { iter: self, f }
    }
}

impl<T: Iterator> IterExt for T {}

pub struct Edit<I, F> {
    iter: I,
    f: F,
}

impl<I, F> Iterator for Edit<I, F>
where
    I: Iterator,
    F: FnMut(&mut I::Item),
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let mut x = self.iter.next()?;
        (self.f)(&mut x);
        Some(x)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
