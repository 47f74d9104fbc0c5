pub fn area(x: i32) -> i32 {
    x * x
}

pub struct Square(pub i32);

impl Square {
    pub fn area(&self) -> i32 {
        area(self.0)
    }
}
